// ─── Discord adapter ───
// Identity fetch plus the backend linkage call that ties a Discord user
// to a Minecraft UUID.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{classify_transport, RestResponse};

const DISCORD_ME_URL: &str = "https://discord.com/api/users/@me";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscordErrorCode {
    InvalidToken,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
struct LinkRequest<'a> {
    discord_token: &'a str,
    minecraft_uuid: &'a str,
}

pub type DiscordResponse<T> = RestResponse<T, DiscordErrorCode>;

pub struct DiscordClient {
    client: Client,
    /// Launcher backend endpoint that records the link.
    link_url: String,
}

impl DiscordClient {
    pub fn new(link_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(crate::http::build_rest_client()?, link_url))
    }

    pub fn with_client(client: Client, link_url: impl Into<String>) -> Self {
        Self {
            client,
            link_url: link_url.into(),
        }
    }

    /// Resolve the Discord identity behind a bearer token.
    pub async fn fetch_user(&self, bearer_token: &str) -> DiscordResponse<DiscordUser> {
        let result = self
            .client
            .get(DISCORD_ME_URL)
            .bearer_auth(bearer_token)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => match resp.json::<DiscordUser>().await {
                Ok(user) => RestResponse::success(user),
                Err(e) => RestResponse::failure(DiscordErrorCode::Unknown, e.to_string()),
            },
            Ok(resp) if resp.status() == reqwest::StatusCode::UNAUTHORIZED => {
                RestResponse::failure(DiscordErrorCode::InvalidToken, "Discord token rejected")
            }
            Ok(resp) => {
                RestResponse::failure(DiscordErrorCode::Unknown, format!("HTTP {}", resp.status()))
            }
            Err(e) => {
                classify_transport(&e);
                RestResponse::failure(DiscordErrorCode::Unknown, e.to_string())
            }
        }
    }

    /// Record the Discord↔Minecraft linkage on the launcher backend.
    pub async fn link_account(
        &self,
        discord_token: &str,
        minecraft_uuid: &str,
    ) -> DiscordResponse<()> {
        let body = LinkRequest {
            discord_token,
            minecraft_uuid,
        };

        let result = self.client.post(&self.link_url).json(&body).send().await;

        match result {
            Ok(resp) if resp.status().is_success() => RestResponse::success(()),
            Ok(resp) => {
                warn!("Linkage rejected with HTTP {}", resp.status());
                RestResponse::failure(DiscordErrorCode::Unknown, format!("HTTP {}", resp.status()))
            }
            Err(e) => {
                classify_transport(&e);
                RestResponse::failure(DiscordErrorCode::Unknown, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_model_tolerates_missing_optional_fields() {
        let user: DiscordUser =
            serde_json::from_str(r#"{"id":"42","username":"steve"}"#).unwrap();
        assert_eq!(user.id, "42");
        assert!(user.discriminator.is_none());
    }
}
