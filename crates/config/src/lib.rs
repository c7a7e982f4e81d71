use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "lectern.toml",
    "config/lectern.toml",
    "crates/config/lectern.toml",
    "../lectern.toml",
    "../config/lectern.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://lectern.db".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_session_ttl")]
    pub session_ttl_seconds: u64,
    #[serde(default = "AuthConfig::default_min_password_length")]
    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: Self::default_session_ttl(),
            min_password_length: Self::default_min_password_length(),
        }
    }
}

impl AuthConfig {
    fn default_session_ttl() -> u64 {
        86_400
    }

    const fn default_min_password_length() -> usize {
        6
    }
}

/// Tunables of the account and progression engine.
///
/// ```
/// use lectern_config::EngineConfig;
///
/// let engine = EngineConfig::default();
/// assert_eq!(engine.lockout.max_failed_attempts, 5);
/// assert_eq!(engine.lockout.lockout_minutes, 120);
/// assert_eq!(engine.progression.pass_score, 70);
/// assert!(engine.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub lockout: LockoutConfig,
    #[serde(default)]
    pub progression: ProgressionConfig,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
    #[serde(default)]
    pub engagement: EngagementConfig,
}

impl EngineConfig {
    /// Reject combinations the engine cannot honour.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.lockout.max_failed_attempts > 0,
            "engine.lockout.max_failed_attempts must be positive"
        );
        ensure!(
            self.lockout.lockout_minutes > 0,
            "engine.lockout.lockout_minutes must be positive"
        );
        ensure!(
            self.progression.pass_score <= 100,
            "engine.progression.pass_score must be within 0..=100"
        );
        ensure!(
            self.progression.total_modules > 0,
            "engine.progression.total_modules must be positive"
        );
        ensure!(
            self.engagement.max_comment_length > 0 && self.engagement.max_question_length > 0,
            "engine.engagement length limits must be positive"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutConfig {
    #[serde(default = "LockoutConfig::default_max_failed_attempts")]
    pub max_failed_attempts: u32,
    #[serde(default = "LockoutConfig::default_lockout_minutes")]
    pub lockout_minutes: i64,
}

impl LockoutConfig {
    const fn default_max_failed_attempts() -> u32 {
        5
    }

    const fn default_lockout_minutes() -> i64 {
        120
    }
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: Self::default_max_failed_attempts(),
            lockout_minutes: Self::default_lockout_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionConfig {
    #[serde(default = "ProgressionConfig::default_pass_score")]
    pub pass_score: u8,
    #[serde(default = "ProgressionConfig::default_total_lessons")]
    pub total_lessons: u32,
    #[serde(default = "ProgressionConfig::default_total_modules")]
    pub total_modules: u32,
    #[serde(default = "ProgressionConfig::default_certificate_base_url")]
    pub certificate_base_url: String,
}

impl ProgressionConfig {
    const fn default_pass_score() -> u8 {
        70
    }

    const fn default_total_lessons() -> u32 {
        35
    }

    const fn default_total_modules() -> u32 {
        8
    }

    fn default_certificate_base_url() -> String {
        "/certificates".to_string()
    }
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            pass_score: Self::default_pass_score(),
            total_lessons: Self::default_total_lessons(),
            total_modules: Self::default_total_modules(),
            certificate_base_url: Self::default_certificate_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(default = "SubscriptionConfig::default_expiry_warning_days")]
    pub expiry_warning_days: i64,
    /// Zero disables the background sweep; `lectern sweep` still works.
    #[serde(default = "SubscriptionConfig::default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl SubscriptionConfig {
    const fn default_expiry_warning_days() -> i64 {
        7
    }

    const fn default_sweep_interval() -> u64 {
        3_600
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            expiry_warning_days: Self::default_expiry_warning_days(),
            sweep_interval_seconds: Self::default_sweep_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementConfig {
    #[serde(default = "EngagementConfig::default_max_comment_length")]
    pub max_comment_length: usize,
    #[serde(default = "EngagementConfig::default_max_question_length")]
    pub max_question_length: usize,
}

impl EngagementConfig {
    const fn default_max_comment_length() -> usize {
        1_000
    }

    const fn default_max_question_length() -> usize {
        2_000
    }
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            max_comment_length: Self::default_max_comment_length(),
            max_question_length: Self::default_max_question_length(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use lectern_config::load;
///
/// std::env::remove_var("LECTERN_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let session_ttl_i64 = i64::try_from(defaults.auth.session_ttl_seconds).unwrap_or(i64::MAX);

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default("auth.session_ttl_seconds", session_ttl_i64)?;

    let environment_overrides = config::Environment::with_prefix("LECTERN").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("LECTERN_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via LECTERN_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.auth.session_ttl_seconds > i64::MAX as u64 {
        config.auth.session_ttl_seconds = i64::MAX as u64;
    }

    config.engine.validate().context("invalid engine configuration")?;

    debug!(?config, "loaded lectern configuration");
    Ok(config)
}
