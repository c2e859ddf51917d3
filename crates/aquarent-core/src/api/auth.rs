use serde::{Deserialize, Serialize};

use crate::profile::UserProfile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    #[serde(alias = "access_token")]
    pub access_token: String,
    #[serde(alias = "refresh_token")]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh endpoint reply. The refresh token is only present when the
/// server rotates it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshGrant {
    #[serde(alias = "access_token")]
    pub access_token: String,
    #[serde(default, alias = "refresh_token")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendOtpRequest {
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpRequest {
    pub phone: String,
    pub otp: String,
}

/// Payload returned by a successful OTP verification.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    #[serde(flatten)]
    pub tokens: TokenPair,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn refresh_grant_accepts_both_casings() {
        let camel: RefreshGrant =
            serde_json::from_value(json!({"accessToken": "a", "refreshToken": "b"}))
                .expect("camel case grant");
        assert_eq!(camel.access_token, "a");
        assert_eq!(camel.refresh_token.as_deref(), Some("b"));

        let snake: RefreshGrant = serde_json::from_value(json!({"access_token": "a"}))
            .expect("snake case grant");
        assert_eq!(snake.refresh_token, None);
    }

    #[test]
    fn auth_session_reads_tokens_and_user() {
        let session: AuthSession = serde_json::from_value(json!({
            "accessToken": "access-1",
            "refreshToken": "refresh-1",
            "user": {"_id": "u-1", "phone": "9990001111"}
        }))
        .expect("auth session");
        assert_eq!(
            session.tokens,
            TokenPair {
                access_token: "access-1".to_string(),
                refresh_token: "refresh-1".to_string(),
            }
        );
        let user = session.user.expect("user");
        assert_eq!(user.id, "u-1");
        assert_eq!(user.phone.as_deref(), Some("9990001111"));
    }

    #[test]
    fn refresh_request_uses_camel_case() {
        let body = serde_json::to_value(RefreshRequest {
            refresh_token: "r".to_string(),
        })
        .expect("encode");
        assert_eq!(body, json!({"refreshToken": "r"}));
    }
}
