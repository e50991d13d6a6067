// ─── Microsoft chain ───
// OAuth token grant → Xbox Live → XSTS → Minecraft services → profile.
// Each hop is a flat POST; XSTS failures carry a numeric `XErr` that maps
// to the only three states a launcher can act on.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::{classify_transport, RestResponse};

const TOKEN_URL: &str = "https://login.live.com/oauth20_token.srf";
const XBL_AUTH_URL: &str = "https://user.auth.xboxlive.com/user/authenticate";
const XSTS_AUTH_URL: &str = "https://xsts.auth.xboxlive.com/xsts/authorize";
const MC_LOGIN_URL: &str = "https://api.minecraftservices.com/authentication/login_with_xbox";
const MC_PROFILE_URL: &str = "https://api.minecraftservices.com/minecraft/profile";

const XERR_NO_XBOX_ACCOUNT: u64 = 2_148_916_233;
const XERR_XBL_BANNED: u64 = 2_148_916_235;
const XERR_UNDER_18: u64 = 2_148_916_238;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MicrosoftErrorCode {
    NoXboxAccount,
    XblBanned,
    Under18,
    NoProfile,
    Unknown,
}

impl MicrosoftErrorCode {
    pub fn from_xerr(xerr: u64) -> Self {
        match xerr {
            XERR_NO_XBOX_ACCOUNT => MicrosoftErrorCode::NoXboxAccount,
            XERR_XBL_BANNED => MicrosoftErrorCode::XblBanned,
            XERR_UNDER_18 => MicrosoftErrorCode::Under18,
            _ => MicrosoftErrorCode::Unknown,
        }
    }
}

/// Which credential the token endpoint is fed.
#[derive(Debug, Clone, Copy)]
pub enum TokenGrant<'a> {
    AuthorizationCode(&'a str),
    RefreshToken(&'a str),
}

#[derive(Debug, Clone, Deserialize)]
pub struct MicrosoftTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct XboxToken {
    pub token: String,
    pub display_claims: DisplayClaims,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayClaims {
    pub xui: Vec<XuiClaim>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XuiClaim {
    pub uhs: String,
}

impl XboxToken {
    pub fn user_hash(&self) -> Option<&str> {
        self.display_claims.xui.first().map(|c| c.uhs.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinecraftToken {
    pub access_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinecraftProfile {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct XstsErrorBody {
    #[serde(rename = "XErr")]
    xerr: Option<u64>,
    message: Option<String>,
}

pub type MicrosoftResponse<T> = RestResponse<T, MicrosoftErrorCode>;

pub struct MicrosoftClient {
    client: Client,
    client_id: String,
    redirect_uri: String,
}

impl MicrosoftClient {
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(
            crate::http::build_rest_client()?,
            client_id,
            redirect_uri,
        ))
    }

    pub fn with_client(
        client: Client,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client,
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// OAuth token endpoint; accepts either the one-shot authorization
    /// code or a stored refresh token.
    pub async fn request_tokens(&self, grant: TokenGrant<'_>) -> MicrosoftResponse<MicrosoftTokens> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("scope", "XboxLive.signin offline_access"),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        match grant {
            TokenGrant::AuthorizationCode(code) => {
                form.push(("grant_type", "authorization_code"));
                form.push(("code", code));
            }
            TokenGrant::RefreshToken(token) => {
                form.push(("grant_type", "refresh_token"));
                form.push(("refresh_token", token));
            }
        }

        let result = self.client.post(TOKEN_URL).form(&form).send().await;
        self.resolve_json(result, "token").await
    }

    /// Xbox Live user authentication with the Microsoft access token.
    pub async fn authenticate_xbl(&self, ms_access_token: &str) -> MicrosoftResponse<XboxToken> {
        let body = json!({
            "Properties": {
                "AuthMethod": "RPS",
                "SiteName": "user.auth.xboxlive.com",
                "RpsTicket": format!("d={}", ms_access_token),
            },
            "RelyingParty": "http://auth.xboxlive.com",
            "TokenType": "JWT",
        });

        let result = self.client.post(XBL_AUTH_URL).json(&body).send().await;
        self.resolve_json(result, "XBL").await
    }

    /// XSTS authorization; the hop where account-state errors surface.
    pub async fn authorize_xsts(&self, xbl_token: &str) -> MicrosoftResponse<XboxToken> {
        let body = json!({
            "Properties": {
                "SandboxId": "RETAIL",
                "UserTokens": [xbl_token],
            },
            "RelyingParty": "rp://api.minecraftservices.com/",
            "TokenType": "JWT",
        });

        let result = self.client.post(XSTS_AUTH_URL).json(&body).send().await;

        match result {
            Ok(resp) if resp.status().is_success() => match resp.json::<XboxToken>().await {
                Ok(token) => RestResponse::success(token),
                Err(e) => RestResponse::failure(MicrosoftErrorCode::Unknown, e.to_string()),
            },
            Ok(resp) => {
                let status = resp.status();
                let body: Option<XstsErrorBody> = resp.json().await.ok();
                let (code, message) = match body {
                    Some(b) => (
                        b.xerr.map(MicrosoftErrorCode::from_xerr).unwrap_or(MicrosoftErrorCode::Unknown),
                        b.message.unwrap_or_else(|| format!("HTTP {}", status)),
                    ),
                    None => (MicrosoftErrorCode::Unknown, format!("HTTP {}", status)),
                };
                debug!("XSTS rejected: {} -> {:?}", status, code);
                RestResponse::failure(code, message)
            }
            Err(e) => Self::transport_failure(&e),
        }
    }

    /// Exchange the XSTS token for a Minecraft services token.
    pub async fn login_with_xbox(&self, user_hash: &str, xsts_token: &str) -> MicrosoftResponse<MinecraftToken> {
        let body = json!({
            "identityToken": format!("XBL3.0 x={};{}", user_hash, xsts_token),
        });

        let result = self.client.post(MC_LOGIN_URL).json(&body).send().await;
        self.resolve_json(result, "login_with_xbox").await
    }

    /// Fetch the Minecraft profile. A 404 here means the Microsoft account
    /// owns no copy of the game.
    pub async fn fetch_profile(&self, mc_access_token: &str) -> MicrosoftResponse<MinecraftProfile> {
        let result = self
            .client
            .get(MC_PROFILE_URL)
            .bearer_auth(mc_access_token)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => match resp.json::<MinecraftProfile>().await {
                Ok(profile) => RestResponse::success(profile),
                Err(e) => RestResponse::failure(MicrosoftErrorCode::Unknown, e.to_string()),
            },
            Ok(resp) if resp.status() == StatusCode::NOT_FOUND => RestResponse::failure(
                MicrosoftErrorCode::NoProfile,
                "No Minecraft profile is attached to this account",
            ),
            Ok(resp) => {
                RestResponse::failure(MicrosoftErrorCode::Unknown, format!("HTTP {}", resp.status()))
            }
            Err(e) => Self::transport_failure(&e),
        }
    }

    async fn resolve_json<T: serde::de::DeserializeOwned>(
        &self,
        result: Result<reqwest::Response, reqwest::Error>,
        stage: &str,
    ) -> MicrosoftResponse<T> {
        match result {
            Ok(resp) if resp.status().is_success() => match resp.json::<T>().await {
                Ok(data) => RestResponse::success(data),
                Err(e) => {
                    warn!("{} body failed to parse: {}", stage, e);
                    RestResponse::failure(MicrosoftErrorCode::Unknown, e.to_string())
                }
            },
            Ok(resp) => {
                RestResponse::failure(MicrosoftErrorCode::Unknown, format!("HTTP {}", resp.status()))
            }
            Err(e) => Self::transport_failure(&e),
        }
    }

    fn transport_failure<T>(err: &reqwest::Error) -> MicrosoftResponse<T> {
        classify_transport(err);
        RestResponse::failure(MicrosoftErrorCode::Unknown, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xerr_constants_map_to_codes() {
        assert_eq!(
            MicrosoftErrorCode::from_xerr(2148916233),
            MicrosoftErrorCode::NoXboxAccount
        );
        assert_eq!(
            MicrosoftErrorCode::from_xerr(2148916235),
            MicrosoftErrorCode::XblBanned
        );
        assert_eq!(
            MicrosoftErrorCode::from_xerr(2148916238),
            MicrosoftErrorCode::Under18
        );
        assert_eq!(
            MicrosoftErrorCode::from_xerr(1),
            MicrosoftErrorCode::Unknown
        );
    }

    #[test]
    fn xbox_token_exposes_first_user_hash() {
        let token: XboxToken = serde_json::from_value(json!({
            "Token": "jwt",
            "DisplayClaims": { "xui": [{ "uhs": "123abc" }] },
        }))
        .unwrap();
        assert_eq!(token.user_hash(), Some("123abc"));
    }

    #[test]
    fn xsts_error_body_parses_xerr() {
        let body: XstsErrorBody = serde_json::from_value(json!({
            "Identity": "0",
            "XErr": 2148916233u64,
            "Message": "",
        }))
        .unwrap();
        assert_eq!(body.xerr, Some(2148916233));
    }
}
