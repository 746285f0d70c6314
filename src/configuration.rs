use crate::auth::CookieNames;
use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: Option<DatabaseSettings>,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub storage: StorageBackend,
    /// Registers `POST /seed` with the development accounts
    #[serde(default)]
    pub seed_users: bool,
}

#[derive(serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    Postgres,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Authentication settings as written in the configuration source
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    /// HMAC key for access tokens; must outlive every issued token
    pub secret: String,
    #[serde(default = "default_cookie_prefix")]
    pub cookie_prefix: String,
    #[serde(default = "default_access_expiry")]
    pub access_token_expires_in: String,
    #[serde(default = "default_refresh_expiry")]
    pub refresh_token_expires_in: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_cookie_prefix() -> String {
    "app".to_string()
}

fn default_access_expiry() -> String {
    "15m".to_string()
}

fn default_refresh_expiry() -> String {
    "30d".to_string()
}

/// Runtime authentication configuration, validated once at startup and
/// passed explicitly to every codec and orchestrator call.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub cookies: CookieNames,
    /// Access token lifetime in seconds
    pub access_ttl: i64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl: i64,
    pub access_token_expires_in: String,
    pub refresh_token_expires_in: String,
}

impl TryFrom<&AuthSettings> for AuthConfig {
    type Error = ConfigError;

    fn try_from(settings: &AuthSettings) -> Result<Self, Self::Error> {
        if settings.secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.secret".to_string()));
        }

        Ok(Self {
            secret: settings.secret.clone(),
            cookies: CookieNames::new(&settings.cookie_prefix),
            access_ttl: parse_ttl(&settings.access_token_expires_in)?,
            refresh_ttl: parse_ttl(&settings.refresh_token_expires_in)?,
            access_token_expires_in: settings.access_token_expires_in.clone(),
            refresh_token_expires_in: settings.refresh_token_expires_in.clone(),
        })
    }
}

/// Longest accepted token lifetime (ten years)
pub const MAX_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// A token lifetime: a valid duration, positive and at most `MAX_TTL_SECONDS`
fn parse_ttl(value: &str) -> Result<i64, ConfigError> {
    let seconds = parse_duration(value)?;
    if seconds <= 0 || seconds > MAX_TTL_SECONDS {
        return Err(ConfigError::InvalidDuration(value.to_string()));
    }
    Ok(seconds)
}

/// Parse a duration string such as `"15m"`, `"1h"` or `"30d"` into seconds.
pub fn parse_duration(value: &str) -> Result<i64, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(value.to_string());

    let trimmed = value.trim();
    let unit = trimmed.chars().last().ok_or_else(invalid)?;
    let multiplier: i64 = match unit {
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return Err(invalid()),
    };

    let amount = trimmed[..trimmed.len() - 1].trim_end();
    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    amount
        .parse::<i64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(invalid)
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?;
    Ok(settings.try_deserialize::<Settings>()?)
}
