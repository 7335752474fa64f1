use secrecy::Secret;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    #[serde(default)]
    pub session: SessionSettings,
    pub storage: StorageSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone)]
pub struct BackendSettings {
    /// Base URL of the hosted project, e.g. https://xyz.supabase.co
    pub url: String,
    /// Public (anon) API key sent with every request.
    pub anon_key: Secret<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SessionSettings {
    /// Upper bound on how long the session stays in the resolving state.
    #[serde(default = "default_bootstrap_timeout_ms")]
    pub bootstrap_timeout_ms: u64,
    /// How long sign-in waits for the listener to publish the identity.
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,
}

impl SessionSettings {
    pub fn bootstrap_timeout(&self) -> Duration {
        Duration::from_millis(self.bootstrap_timeout_ms)
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            bootstrap_timeout_ms: default_bootstrap_timeout_ms(),
            settle_timeout_ms: default_settle_timeout_ms(),
        }
    }
}

fn default_bootstrap_timeout_ms() -> u64 {
    4000
}

fn default_settle_timeout_ms() -> u64 {
    1500
}

#[derive(Deserialize, Clone)]
pub struct StorageSettings {
    pub path: PathBuf,
}

#[derive(Deserialize, Clone)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP gRPC endpoint; spans are only exported when set.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("cannot resolve working directory: {}", e)))?;

    // Allow running from the workspace root or from the crate directory
    let configuration_directory = if base_path.ends_with("pestgo-web") {
        base_path.join("config")
    } else {
        base_path.join("pestgo-web").join("config")
    };

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}

impl Settings {
    fn validate(&self) -> Result<(), config::ConfigError> {
        if !(3000..=5000).contains(&self.session.bootstrap_timeout_ms) {
            return Err(config::ConfigError::Message(format!(
                "session.bootstrap_timeout_ms must be between 3000 and 5000, got {}",
                self.session.bootstrap_timeout_ms
            )));
        }
        if self.backend.url.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "backend.url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(bootstrap_timeout_ms: u64, url: &str) -> Settings {
        Settings {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            backend: BackendSettings {
                url: url.to_string(),
                anon_key: Secret::new("anon".to_string()),
            },
            session: SessionSettings {
                bootstrap_timeout_ms,
                ..SessionSettings::default()
            },
            storage: StorageSettings {
                path: PathBuf::from("storage.json"),
            },
            telemetry: TelemetrySettings::default(),
        }
    }

    #[test]
    fn test_bootstrap_timeout_must_stay_within_window() {
        assert!(settings(3000, "http://localhost:54321").validate().is_ok());
        assert!(settings(5000, "http://localhost:54321").validate().is_ok());
        assert!(settings(2999, "http://localhost:54321").validate().is_err());
        assert!(settings(5001, "http://localhost:54321").validate().is_err());
    }

    #[test]
    fn test_backend_url_is_required() {
        assert!(settings(4000, "  ").validate().is_err());
    }

    #[test]
    fn test_session_defaults() {
        let defaults = SessionSettings::default();
        assert_eq!(defaults.bootstrap_timeout(), Duration::from_millis(4000));
        assert_eq!(defaults.settle_timeout(), Duration::from_millis(1500));
    }
}
