// Authentication types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// OAuth2 scope requested on every password grant
pub const TOKEN_SCOPE: &str = "cn mail sn givenname uid employeeNumber";

/// Token endpoint path, relative to the auth base URL
pub const TOKEN_PATH: [&str; 3] = ["Epsilon", "oauth2", "access_token"];

/// Client and user credentials for the password grant
///
/// Fixed for the lifetime of a client. Secrets never appear in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Bearer token issued by the auth endpoint
///
/// Never mutated after construction; a refresh replaces the whole value.
/// The empty token (no access token string) is what a store holds before the
/// first successful authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    access_token: String,
    token_type: String,
    expires_in: Option<u64>,
    refresh_token: Option<String>,
    issued_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        expires_in: Option<u64>,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_in,
            refresh_token,
            issued_at: Some(Utc::now()),
        }
    }

    /// Sentinel used before any token has been acquired
    pub fn empty() -> Self {
        Self {
            access_token: String::new(),
            token_type: String::new(),
            expires_in: None,
            refresh_token: None,
            issued_at: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_empty()
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }

    /// Unused by the client; the remote issues it for future use
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    /// Expiration instant, when both issue time and lifetime are known
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.expires_in?).ok()?;
        Some(self.issued_at? + Duration::seconds(secs))
    }

    /// Value of the `Authorization` header carrying this token
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl Default for AccessToken {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = if self.access_token.is_empty() {
            "<empty>"
        } else {
            "<redacted>"
        };
        f.debug_struct("AccessToken")
            .field("access_token", &redacted)
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Token endpoint response body
#[derive(Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl From<AccessTokenResponse> for AccessToken {
    fn from(data: AccessTokenResponse) -> Self {
        AccessToken::new(
            data.access_token,
            data.token_type.unwrap_or_else(|| "Bearer".to_string()),
            data.expires_in,
            data.refresh_token,
        )
    }
}

/// `expires_in` arrives as a number, but older deployments send a string
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(u64),
        Text(String),
    }

    match Option::<Seconds>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Seconds::Number(n)) => Ok(Some(n)),
        Some(Seconds::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_token_sentinel() {
        let token = AccessToken::empty();
        assert!(token.is_empty());
        assert_eq!(token.access_token(), "");
        assert_eq!(token.bearer(), "Bearer ");
        assert!(token.expires_at().is_none());
        assert_eq!(AccessToken::default(), token);
    }

    #[test]
    fn test_parse_token_response() {
        let json = r#"{
            "expires_in": 59,
            "token_type": "Bearer",
            "refresh_token": "refresh_token",
            "access_token": "access_token"
        }"#;
        let token: AccessToken = serde_json::from_str::<AccessTokenResponse>(json)
            .unwrap()
            .into();

        assert_eq!(token.access_token(), "access_token");
        assert_eq!(token.token_type(), "Bearer");
        assert_eq!(token.expires_in(), Some(59));
        assert_eq!(token.refresh_token(), Some("refresh_token"));
        assert_eq!(token.bearer(), "Bearer access_token");

        let expires_at = token.expires_at().unwrap();
        assert_eq!(
            (expires_at - token.issued_at().unwrap()).num_seconds(),
            59
        );
    }

    #[test]
    fn test_expires_in_as_string() {
        let json = r#"{"access_token": "abc", "expires_in": "3600"}"#;
        let data: AccessTokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(data.expires_in, Some(3600));
        assert!(data.token_type.is_none());
    }

    #[test]
    fn test_expires_in_garbage_is_rejected() {
        let json = r#"{"access_token": "abc", "expires_in": "soon"}"#;
        assert!(serde_json::from_str::<AccessTokenResponse>(json).is_err());
    }

    #[test]
    fn test_missing_access_token_is_rejected() {
        let json = r#"{"token_type": "Bearer", "expires_in": 59}"#;
        assert!(serde_json::from_str::<AccessTokenResponse>(json).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials {
            client_id: "client_id".to_string(),
            client_secret: "client_pass".to_string(),
            username: "user_name".to_string(),
            password: "user_pass".to_string(),
        };
        let out = format!("{:?}", creds);
        assert!(out.contains("client_id"));
        assert!(!out.contains("client_pass"));
        assert!(!out.contains("user_pass"));

        let token = AccessToken::new("secret-token", "Bearer", Some(60), None);
        assert!(!format!("{:?}", token).contains("secret-token"));
    }
}
