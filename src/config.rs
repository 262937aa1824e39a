//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is read first if present.

use crate::models::ProviderKind;
use crate::services::{ProviderCredential, SignOutPolicy};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

const DEFAULT_STORE_PATH: &str = ".mecard/store.json";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project holding the Firestore database
    pub gcp_project_id: String,
    /// Web API key for the Identity Toolkit (not needed offline)
    pub api_key: Option<String>,
    /// Override for the Identity Toolkit endpoint (Auth emulator)
    pub identity_base_url: Option<String>,
    /// Local key-value store file
    pub store_path: PathBuf,
    pub sign_out_policy: SignOutPolicy,
    /// Use in-memory remote store and a static identity
    pub offline: bool,
    /// Per-provider OAuth credentials for sign-in
    pub provider_credentials: HashMap<ProviderKind, ProviderCredential>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let offline = match env::var("MECARD_OFFLINE") {
            Ok(v) => parse_bool("MECARD_OFFLINE", &v)?,
            Err(_) => false,
        };

        let api_key = env::var("MECARD_API_KEY")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if api_key.is_none() && !offline {
            return Err(ConfigError::Missing("MECARD_API_KEY"));
        }

        let sign_out_policy = match env::var("MECARD_SIGN_OUT_POLICY") {
            Ok(v) => v
                .parse()
                .map_err(|_| ConfigError::Invalid("MECARD_SIGN_OUT_POLICY", v))?,
            Err(_) => SignOutPolicy::default(),
        };

        let mut provider_credentials = HashMap::new();
        for kind in ProviderKind::ALL {
            let suffix = kind.as_str().to_ascii_uppercase();
            if let Ok(token) = env::var(format!("MECARD_PROVIDER_TOKEN_{}", suffix)) {
                let secret = env::var(format!("MECARD_PROVIDER_SECRET_{}", suffix))
                    .ok()
                    .map(|v| v.trim().to_string());
                provider_credentials.insert(
                    kind,
                    ProviderCredential {
                        access_token: token.trim().to_string(),
                        secret,
                    },
                );
            }
        }

        Ok(Self {
            gcp_project_id: env::var("MECARD_PROJECT_ID")
                .unwrap_or_else(|_| "local-dev".to_string()),
            api_key,
            identity_base_url: env::var("MECARD_IDENTITY_URL").ok(),
            store_path: env::var("MECARD_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORE_PATH)),
            sign_out_policy,
            offline,
            provider_credentials,
        })
    }

    /// Deterministic configuration for tests.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            api_key: None,
            identity_base_url: None,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            sign_out_policy: SignOutPolicy::FullProfile,
            offline: true,
            provider_credentials: HashMap::new(),
        }
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid(name, value.to_string())),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment is process-global; keep every env-mutating assertion in
    // this one test.
    #[test]
    fn test_config_from_env() {
        env::set_var("MECARD_API_KEY", "test_key");
        env::set_var("MECARD_SIGN_OUT_POLICY", "flag-only");
        env::set_var("MECARD_PROVIDER_TOKEN_GOOGLE", "goog-token");
        env::set_var("MECARD_OFFLINE", "no");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.api_key.as_deref(), Some("test_key"));
        assert_eq!(config.sign_out_policy, SignOutPolicy::FlagOnly);
        assert!(!config.offline);
        let google = config
            .provider_credentials
            .get(&ProviderKind::Google)
            .expect("google credential");
        assert_eq!(google.access_token, "goog-token");
        assert!(!config.provider_credentials.contains_key(&ProviderKind::Github));

        env::set_var("MECARD_SIGN_OUT_POLICY", "whenever");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("MECARD_SIGN_OUT_POLICY", _))
        ));

        env::remove_var("MECARD_SIGN_OUT_POLICY");
        env::remove_var("MECARD_API_KEY");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("MECARD_API_KEY"))
        ));

        env::set_var("MECARD_OFFLINE", "true");
        let offline = Config::from_env().expect("offline config needs no key");
        assert!(offline.offline);
        assert_eq!(offline.sign_out_policy, SignOutPolicy::FullProfile);

        env::remove_var("MECARD_OFFLINE");
        env::remove_var("MECARD_PROVIDER_TOKEN_GOOGLE");
    }

    #[test]
    fn test_test_default_is_offline() {
        let config = Config::test_default();
        assert!(config.offline);
        assert!(config.api_key.is_none());
        assert_eq!(config.sign_out_policy, SignOutPolicy::FullProfile);
        assert!(config.provider_credentials.is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "TRUE").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }
}
