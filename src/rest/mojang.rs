// ─── Yggdrasil adapter ───
// The legacy Mojang authentication protocol. Flat request/response calls
// against authserver.mojang.com; the interesting part is mapping the
// error/errorMessage/cause triple onto actionable codes.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{classify_transport, RestResponse, TransportFailure};

const AUTH_SERVER: &str = "https://authserver.mojang.com";
const MINECRAFT_AGENT: Agent = Agent {
    name: "Minecraft",
    version: 1,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MojangErrorCode {
    MethodNotAllowed,
    NotFound,
    UserMigrated,
    InvalidCredentials,
    Ratelimit,
    InvalidToken,
    AccessTokenHasProfile,
    CredentialsMissing,
    InvalidSaltVersion,
    UnsupportedMediaType,
    Gone,
    NotPaid,
    Unreachable,
    Unknown,
}

impl MojangErrorCode {
    /// Codes that can only arise from a client-side bug, never from
    /// anything the user typed.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            MojangErrorCode::MethodNotAllowed
                | MojangErrorCode::NotFound
                | MojangErrorCode::AccessTokenHasProfile
                | MojangErrorCode::CredentialsMissing
                | MojangErrorCode::InvalidSaltVersion
                | MojangErrorCode::UnsupportedMediaType
        )
    }

    /// Map the Yggdrasil error body onto a code.
    pub fn decode(body: &MojangErrorBody) -> Self {
        let error = body.error.as_deref().unwrap_or("");
        let message = body.error_message.as_deref().unwrap_or("");
        let cause = body.cause.as_deref().unwrap_or("");

        match error {
            "Method Not Allowed" => MojangErrorCode::MethodNotAllowed,
            "Not Found" => MojangErrorCode::NotFound,
            "Unsupported Media Type" => MojangErrorCode::UnsupportedMediaType,
            "Gone" => MojangErrorCode::Gone,
            "ForbiddenOperationException" => {
                if cause == "UserMigratedException" {
                    MojangErrorCode::UserMigrated
                } else if message == "Invalid credentials. Invalid username or password." {
                    MojangErrorCode::InvalidCredentials
                } else if message == "Invalid credentials." {
                    MojangErrorCode::Ratelimit
                } else if message.contains("Invalid token") {
                    MojangErrorCode::InvalidToken
                } else if message.contains("Forbidden") {
                    MojangErrorCode::CredentialsMissing
                } else {
                    MojangErrorCode::Unknown
                }
            }
            "IllegalArgumentException" => {
                if message.contains("Access token already has a profile") {
                    MojangErrorCode::AccessTokenHasProfile
                } else if message.contains("credentials is null") {
                    MojangErrorCode::CredentialsMissing
                } else if message.contains("Invalid salt version") {
                    MojangErrorCode::InvalidSaltVersion
                } else {
                    MojangErrorCode::Unknown
                }
            }
            "ResourceException" => MojangErrorCode::NotPaid,
            _ => MojangErrorCode::Unknown,
        }
    }
}

/// Error document returned by Yggdrasil endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MojangErrorBody {
    pub error: Option<String>,
    pub error_message: Option<String>,
    pub cause: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct Agent {
    name: &'static str,
    version: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticateRequest<'a> {
    agent: Agent,
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_token: Option<&'a str>,
    request_user: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenPair<'a> {
    access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_token: Option<&'a str>,
}

/// An authenticated Yggdrasil session. Held only in transit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MojangSession {
    pub access_token: String,
    pub client_token: String,
    #[serde(default)]
    pub selected_profile: Option<MojangProfile>,
    #[serde(default)]
    pub available_profiles: Option<Vec<MojangProfile>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MojangProfile {
    pub id: String,
    pub name: String,
}

pub type MojangResponse<T> = RestResponse<T, MojangErrorCode>;

pub struct MojangClient {
    client: Client,
    base_url: String,
}

impl MojangClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(crate::http::build_rest_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: AUTH_SERVER.to_string(),
        }
    }

    /// Exchange username/password for a session.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        client_token: Option<&str>,
    ) -> MojangResponse<MojangSession> {
        let body = AuthenticateRequest {
            agent: MINECRAFT_AGENT,
            username,
            password,
            client_token,
            request_user: true,
        };

        let result = self
            .client
            .post(format!("{}/authenticate", self.base_url))
            .json(&body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => match resp.json::<MojangSession>().await {
                Ok(session) => RestResponse::success(session),
                Err(e) => {
                    warn!("Authenticate body failed to parse: {}", e);
                    RestResponse::failure(MojangErrorCode::Unknown, e.to_string())
                }
            },
            Ok(resp) => Self::decode_error(resp).await,
            Err(e) => Self::transport_failure(&e),
        }
    }

    /// Check whether an access token is still usable.
    ///
    /// HTTP 204 means valid; 403 is the server's way of saying "no" and
    /// resolves successfully with `data = false`.
    pub async fn validate(&self, access_token: &str, client_token: Option<&str>) -> MojangResponse<bool> {
        let body = TokenPair {
            access_token,
            client_token,
        };

        let result = self
            .client
            .post(format!("{}/validate", self.base_url))
            .json(&body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => RestResponse::success(true),
            Ok(resp) if resp.status() == StatusCode::FORBIDDEN => RestResponse::success(false),
            Ok(resp) => Self::decode_error(resp).await,
            Err(e) => Self::transport_failure(&e),
        }
    }

    /// Invalidate an access token.
    pub async fn invalidate(&self, access_token: &str, client_token: Option<&str>) -> MojangResponse<()> {
        let body = TokenPair {
            access_token,
            client_token,
        };

        let result = self
            .client
            .post(format!("{}/invalidate", self.base_url))
            .json(&body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => RestResponse::success(()),
            Ok(resp) => Self::decode_error(resp).await,
            Err(e) => Self::transport_failure(&e),
        }
    }

    /// Trade a stale access token for a fresh session.
    pub async fn refresh(
        &self,
        access_token: &str,
        client_token: &str,
    ) -> MojangResponse<MojangSession> {
        let body = TokenPair {
            access_token,
            client_token: Some(client_token),
        };

        let result = self
            .client
            .post(format!("{}/refresh", self.base_url))
            .json(&body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => match resp.json::<MojangSession>().await {
                Ok(session) => RestResponse::success(session),
                Err(e) => RestResponse::failure(MojangErrorCode::Unknown, e.to_string()),
            },
            Ok(resp) => Self::decode_error(resp).await,
            Err(e) => Self::transport_failure(&e),
        }
    }

    async fn decode_error<T>(resp: reqwest::Response) -> MojangResponse<T> {
        let status = resp.status();
        let body: MojangErrorBody = resp.json().await.unwrap_or_default();
        let code = MojangErrorCode::decode(&body);
        debug!("Yggdrasil error {}: {:?} -> {:?}", status, body, code);

        let message = body
            .error_message
            .unwrap_or_else(|| format!("HTTP {}", status));
        RestResponse::failure(code, message)
    }

    fn transport_failure<T>(err: &reqwest::Error) -> MojangResponse<T> {
        let code = match classify_transport(err) {
            TransportFailure::DnsFailure => MojangErrorCode::Unreachable,
            _ => MojangErrorCode::Unknown,
        };
        RestResponse::failure(code, err.to_string())
    }
}
