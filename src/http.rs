use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

const APP_USER_AGENT: &str = "NebulaLauncher/0.1.0";

/// Suggested end-to-end timeout for flat REST adapters.
pub const REST_TIMEOUT: Duration = Duration::from_millis(2500);

pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .build()
}

/// Client variant for the REST adapters: same defaults plus the short
/// end-to-end timeout.
pub fn build_rest_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(REST_TIMEOUT)
        .build()
}
