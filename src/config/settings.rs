use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::time::Duration;

/// Environment variable names used by existing deployments, mapped onto
/// their configuration keys. These take precedence over every other source.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("NATS_URL", "nats.url"),
    ("CONFIG_URL", "directory.url"),
    ("MAIL_API_URL", "mail.url"),
    ("MAIL_TOKEN", "mail.token"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub nats: NatsConfig,
    pub directory: DirectoryConfig,
    pub mail: MailConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    #[serde(default = "default_nats_url")]
    pub url: String,
    /// Subject carrying timetable change events
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_max_reconnects")]
    pub max_reconnects: usize,
    /// Delay between reconnection attempts in seconds
    #[serde(default = "default_reconnect_wait")]
    pub reconnect_wait_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_directory_url")]
    pub url: String,
    #[serde(default = "default_directory_timeout")]
    pub timeout_secs: u64,
}

#[derive(Clone, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_mail_url")]
    pub url: String,
    /// Value sent verbatim in the `Authorization` header
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    /// Bundled template used for every alert
    #[serde(default = "default_template")]
    pub template: String,
    /// Maximum number of bus messages processed concurrently
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_enabled")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_subject() -> String {
    "TIMETABLE.ALERTER".to_string()
}

fn default_max_reconnects() -> usize {
    5
}

fn default_reconnect_wait() -> u64 {
    2
}

fn default_directory_url() -> String {
    "http://localhost:8080/alerts".to_string()
}

fn default_directory_timeout() -> u64 {
    5
}

fn default_mail_url() -> String {
    "https://mail-api.edu.forestier.re/mail".to_string()
}

fn default_mail_timeout() -> u64 {
    10
}

fn default_template() -> String {
    "alert.txt".to_string()
}

fn default_max_in_flight() -> usize {
    16
}

fn default_server_enabled() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9090
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "timetable-alerter".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Self::defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // ALERTER__MAIL__TIMEOUT_SECS, ALERTER__SERVER__PORT, ...
            .add_source(
                Environment::with_prefix("ALERTER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        apply_legacy_env(builder, |key| env::var(key).ok())?
            .build()?
            .try_deserialize()
    }

    fn defaults(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        builder
            .set_default("nats.url", default_nats_url())?
            .set_default("nats.subject", default_subject())?
            .set_default("directory.url", default_directory_url())?
            .set_default("mail.url", default_mail_url())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn apply_legacy_env<F>(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: F,
) -> Result<ConfigBuilder<DefaultState>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for (var, key) in LEGACY_ENV {
        builder = builder.set_override_option(*key, lookup(var))?;
    }
    Ok(builder)
}

impl NatsConfig {
    pub fn reconnect_wait(&self) -> Duration {
        Duration::from_secs(self.reconnect_wait_secs)
    }
}

impl DirectoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl MailConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: default_nats_url(),
            subject: default_subject(),
            max_reconnects: default_max_reconnects(),
            reconnect_wait_secs: default_reconnect_wait(),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: default_directory_url(),
            timeout_secs: default_directory_timeout(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            url: default_mail_url(),
            token: None,
            timeout_secs: default_mail_timeout(),
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_server_enabled(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let builder = Settings::defaults(Config::builder()).unwrap();
        apply_legacy_env(builder, |key| vars.get(key).cloned())
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_values() {
        let settings = load(&[]);
        assert_eq!(settings.nats.url, "nats://localhost:4222");
        assert_eq!(settings.nats.subject, "TIMETABLE.ALERTER");
        assert_eq!(settings.nats.max_reconnects, 5);
        assert_eq!(settings.directory.url, "http://localhost:8080/alerts");
        assert_eq!(settings.directory.timeout(), Duration::from_secs(5));
        assert_eq!(settings.mail.url, "https://mail-api.edu.forestier.re/mail");
        assert_eq!(settings.mail.timeout(), Duration::from_secs(10));
        assert!(settings.mail.token.is_none());
        assert_eq!(settings.processor.template, "alert.txt");
        assert_eq!(settings.server.port, 9090);
        assert!(!settings.otel.enabled);
    }

    #[test]
    fn test_legacy_env_overrides() {
        let settings = load(&[
            ("NATS_URL", "nats://bus:4222"),
            ("CONFIG_URL", "http://config/alerts"),
            ("MAIL_API_URL", "http://mail/send"),
            ("MAIL_TOKEN", "secret-token"),
        ]);
        assert_eq!(settings.nats.url, "nats://bus:4222");
        assert_eq!(settings.directory.url, "http://config/alerts");
        assert_eq!(settings.mail.url, "http://mail/send");
        assert_eq!(settings.mail.token.as_deref(), Some("secret-token"));
    }

    #[test]
    fn test_mail_token_is_redacted_in_debug() {
        let mail = MailConfig {
            token: Some("secret-token".to_string()),
            ..MailConfig::default()
        };
        let debug = format!("{:?}", mail);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_server_addr() {
        let settings = load(&[]);
        assert_eq!(settings.server_addr(), "0.0.0.0:9090");
    }
}
