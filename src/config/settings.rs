use serde::{Deserialize, Serialize};
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub zoho: ZohoSettings,
    pub dataswyft: DataswyftSettings,
    pub connector: ConnectorSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL, used to build diagnostic page links
    pub public_base_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ZohoSettings {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub accounts_url: String,
    /// Fallback API domain when the token response carries none
    pub api_domain: String,
    pub refresh_token: Option<String>,
    pub scope: String,
    pub redirect_uri: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DataswyftSettings {
    pub api_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConnectorSettings {
    /// Expected `application` claim of caller tokens (checked only when set)
    pub application_id: Option<String>,
    /// Forces writes into the `test` namespace
    #[serde(default)]
    pub test_mode: bool,
    pub http_timeout_secs: u64,
    pub max_attempts: u32,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.public_base_url", "http://localhost:8080")?
            .set_default("zoho.accounts_url", "https://accounts.zoho.com")?
            .set_default("zoho.api_domain", "https://www.zohoapis.com")?
            .set_default("zoho.scope", "ZohoCRM.modules.contacts.ALL")?
            .set_default("zoho.redirect_uri", "http://localhost:8080/auth/zoho/callback")?
            .set_default("dataswyft.api_url", "https://postman.hubat.net")?
            .set_default("connector.test_mode", false)?
            .set_default("connector.http_timeout_secs", 30)?
            .set_default("connector.max_attempts", 3)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        // Same variable names the connector has always been deployed with
        let overrides = [
            ("CONNECTOR_PORT", "server.port"),
            ("CONNECTOR_PUBLIC_BASE_URL", "server.public_base_url"),
            ("ZOHO_CRM_CLIENT_ID", "zoho.client_id"),
            ("ZOHO_CRM_CLIENT_SECRET", "zoho.client_secret"),
            ("ZOHO_CRM_ACCOUNTS_URL", "zoho.accounts_url"),
            ("ZOHO_CRM_API_DOMAIN", "zoho.api_domain"),
            ("ZOHO_CRM_REFRESH_TOKEN", "zoho.refresh_token"),
            ("ZOHO_CRM_SCOPE", "zoho.scope"),
            ("ZOHO_CRM_REDIRECT_URI", "zoho.redirect_uri"),
            ("DATASWIFT_API_URL", "dataswyft.api_url"),
            ("DATASWIFT_USERNAME", "dataswyft.username"),
            ("DATASWIFT_PASSWORD", "dataswyft.password"),
            ("DS_APPLICATION_ID", "connector.application_id"),
            ("CONNECTOR_TEST_MODE", "connector.test_mode"),
        ];
        for (var, key) in overrides {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    builder = builder.set_override(key, value)?;
                }
            }
        }

        builder = builder.add_source(Environment::with_prefix("CONNECTOR").separator("__"));

        let s = builder.build()?;

        s.try_deserialize()
    }

    /// Effective listen port: Cloud Run style `PORT` wins over configuration.
    pub fn listen_port(&self) -> u16 {
        std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(self.server.port)
    }
}
