//! OAuth2 Configuration
//!
//! Everything the connector needs to talk to the Zoho accounts server.

use serde::{Deserialize, Serialize};

use crate::config::Settings;

/// Value shipped in `.env.example`; treated the same as a missing refresh token.
pub const PLACEHOLDER_REFRESH_TOKEN: &str = "your_refresh_token_here";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Config {
    /// Client ID issued by the Zoho API console
    pub client_id: String,

    /// Client secret issued by the Zoho API console
    pub client_secret: String,

    /// Accounts server, e.g. `https://accounts.zoho.com` (region specific)
    pub accounts_url: String,

    /// API domain used when the token response does not carry one
    pub default_api_domain: String,

    /// Long-lived refresh token obtained through the authorization-code flow
    pub refresh_token: Option<String>,

    /// Scopes requested on the consent screen
    pub scope: String,

    /// Redirect URI registered for the client
    pub redirect_uri: String,
}

impl OAuth2Config {
    /// Builds the config from loaded settings; client id and secret are mandatory.
    pub fn from_settings(settings: &Settings) -> Result<Self, String> {
        let zoho = &settings.zoho;

        if zoho.client_id.trim().is_empty() || zoho.client_secret.trim().is_empty() {
            return Err("ZOHO_CRM_CLIENT_ID and ZOHO_CRM_CLIENT_SECRET are required".to_string());
        }

        Ok(Self {
            client_id: zoho.client_id.clone(),
            client_secret: zoho.client_secret.clone(),
            accounts_url: zoho.accounts_url.trim_end_matches('/').to_string(),
            default_api_domain: zoho.api_domain.trim_end_matches('/').to_string(),
            refresh_token: zoho.refresh_token.clone(),
            scope: zoho.scope.clone(),
            redirect_uri: zoho.redirect_uri.clone(),
        })
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth/v2/token", self.accounts_url)
    }

    /// Refresh token, unless it is missing or still the placeholder.
    pub fn usable_refresh_token(&self) -> Option<&str> {
        self.refresh_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != PLACEHOLDER_REFRESH_TOKEN)
    }

    /// Consent URL for the one-time authorization-code flow.
    ///
    /// `access_type=offline` and `prompt=consent` make Zoho return a refresh token.
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}/oauth/v2/auth?response_type=code&client_id={}&scope={}&redirect_uri={}&access_type=offline&prompt=consent&state={}",
            self.accounts_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.scope),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(state)
        )
    }
}

#[cfg(test)]
pub(crate) fn test_config(accounts_url: &str) -> OAuth2Config {
    OAuth2Config {
        client_id: "1000.TESTCLIENT".to_string(),
        client_secret: "test_secret".to_string(),
        accounts_url: accounts_url.to_string(),
        default_api_domain: "https://www.zohoapis.com".to_string(),
        refresh_token: Some("1000.refresh".to_string()),
        scope: "ZohoCRM.modules.contacts.ALL".to_string(),
        redirect_uri: "https://example.com/callback".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_url() {
        let url = test_config("https://accounts.zoho.eu").authorization_url("abc");
        assert!(url.starts_with("https://accounts.zoho.eu/oauth/v2/auth?response_type=code"));
        assert!(url.contains("client_id=1000.TESTCLIENT"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fexample.com%2Fcallback"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.ends_with("state=abc"));
    }

    #[test]
    fn test_placeholder_refresh_token_is_not_usable() {
        let mut config = test_config("https://accounts.zoho.com");
        assert_eq!(config.usable_refresh_token(), Some("1000.refresh"));

        config.refresh_token = Some(PLACEHOLDER_REFRESH_TOKEN.to_string());
        assert_eq!(config.usable_refresh_token(), None);

        config.refresh_token = Some("   ".to_string());
        assert_eq!(config.usable_refresh_token(), None);

        config.refresh_token = None;
        assert_eq!(config.usable_refresh_token(), None);
    }

    #[test]
    fn test_token_url() {
        assert_eq!(
            test_config("https://accounts.zoho.com").token_url(),
            "https://accounts.zoho.com/oauth/v2/token"
        );
    }
}
