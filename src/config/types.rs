//! Configuration types and CLI options.
//!
//! [`Config`] doubles as the clap argument struct: every field can be set from a
//! flag or an environment variable, and `Config::default()` gives the same values
//! for library and test use.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};

use crate::config::constants::*;

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Pipeline configuration.
///
/// # Examples
///
/// ```no_run
/// use takedown_pipeline::Config;
///
/// let config = Config {
///     llm_api_key: Some("sk-test".into()),
///     stagger_interval_secs: 60,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain, global = true)]
    pub log_format: LogFormat,

    /// Database path (SQLite file)
    #[arg(long, env = "TAKEDOWN_DB_PATH", default_value = DB_PATH, global = true)]
    pub db_path: PathBuf,

    /// Address the HTTP API binds to
    #[arg(long, env = "TAKEDOWN_BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub bind_addr: String,

    /// Per-request timeout for generic page fetches, in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_seconds: u64,

    /// HTTP User-Agent header value for evidence fetches
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Screenshot rendering API endpoint (receives `url` as a query parameter)
    #[arg(long, env = "SCREENSHOT_API_URL")]
    pub screenshot_api_url: Option<String>,

    /// Screenshot rendering API key
    #[arg(long, env = "SCREENSHOT_API_KEY", hide_env_values = true)]
    pub screenshot_api_key: Option<String>,

    /// Durable object storage upload endpoint for screenshots
    #[arg(long, env = "EVIDENCE_STORAGE_URL")]
    pub storage_upload_url: Option<String>,

    /// Durable object storage API key
    #[arg(long, env = "EVIDENCE_STORAGE_KEY", hide_env_values = true)]
    pub storage_api_key: Option<String>,

    /// OpenAI-compatible chat completions base URL
    #[arg(long, env = "LLM_API_URL", default_value = "https://api.openai.com/v1")]
    pub llm_api_url: String,

    /// LLM API key; the AI filter passes everything through for review when unset
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// LLM model name
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o-mini")]
    pub llm_model: String,

    /// WHOIS API base URL (single and bulk lookups)
    #[arg(long, env = "WHOIS_API_URL")]
    pub whois_api_url: Option<String>,

    /// WHOIS API key
    #[arg(long, env = "WHOIS_API_KEY", hide_env_values = true)]
    pub whois_api_key: Option<String>,

    /// Directory for cached WHOIS lookups; caching is off when unset
    #[arg(long, env = "WHOIS_CACHE_DIR")]
    pub whois_cache_dir: Option<PathBuf>,

    /// Transactional email API endpoint used to send notices
    #[arg(long, env = "EMAIL_API_URL")]
    pub email_api_url: Option<String>,

    /// Transactional email API key
    #[arg(long, env = "EMAIL_API_KEY", hide_env_values = true)]
    pub email_api_key: Option<String>,

    /// Sender address for notices
    #[arg(long, env = "EMAIL_FROM", default_value = "notices@localhost")]
    pub email_from: String,

    /// OpenTimestamps calendar server
    #[arg(long, env = "NOTARY_CALENDAR_URL", default_value = DEFAULT_NOTARY_CALENDAR_URL)]
    pub notary_calendar_url: String,

    /// Esplora block explorer API used to date Bitcoin attestations
    #[arg(long, env = "ESPLORA_URL", default_value = DEFAULT_ESPLORA_URL)]
    pub esplora_url: String,

    /// Disable blockchain timestamping entirely (proofs are recorded as failed)
    #[arg(long, env = "DISABLE_TIMESTAMPS")]
    pub disable_timestamps: bool,

    /// Wayback Machine base URL used to archive pages at verification time
    #[arg(long, env = "WAYBACK_URL", default_value = DEFAULT_WAYBACK_URL)]
    pub wayback_url: String,

    /// Skip Wayback Machine archiving
    #[arg(long, env = "DISABLE_WAYBACK")]
    pub disable_wayback: bool,

    /// CRM webhook notified of takedown events (best effort)
    #[arg(long, env = "CRM_WEBHOOK_URL")]
    pub crm_webhook_url: Option<String>,

    /// Shared secret required by the internal queue processing trigger
    #[arg(long, env = "QUEUE_SECRET", hide_env_values = true)]
    pub queue_secret: Option<String>,

    /// Seconds between staggered email sends within a batch
    #[arg(long, default_value_t = STAGGER_INTERVAL_SECS)]
    pub stagger_interval_secs: u64,

    /// Seconds a user must wait between two batches
    #[arg(long, default_value_t = BATCH_COOLDOWN_SECS)]
    pub batch_cooldown_secs: u64,

    /// Maximum notices per batch
    #[arg(long, default_value_t = MAX_BATCH_ITEMS)]
    pub max_batch_items: usize,

    /// Confidence needed for the AI filter to pass a result outright
    #[arg(long, default_value_t = DEFAULT_MIN_CONFIDENCE)]
    pub filter_min_confidence: f64,

    /// Lower edge of the uncertain band that is still passed for human review
    #[arg(long, default_value_t = UNCERTAIN_CONFIDENCE_FLOOR)]
    pub filter_uncertain_floor: f64,

    /// Seconds between periodic queue sweeps
    #[arg(long, default_value_t = QUEUE_POLL_INTERVAL_SECS)]
    pub queue_poll_interval_secs: u64,

    /// Seconds between timestamp upgrade sweeps
    #[arg(long, default_value_t = TIMESTAMP_UPGRADE_INTERVAL_SECS)]
    pub timestamp_upgrade_interval_secs: u64,

    /// Audit entries buffered before an automatic flush
    #[arg(long, default_value_t = AUDIT_BUFFER_SIZE)]
    pub audit_buffer_size: usize,
}

impl Config {
    pub fn stagger_interval(&self) -> Duration {
        Duration::from_secs(self.stagger_interval_secs)
    }

    pub fn batch_cooldown(&self) -> Duration {
        Duration::from_secs(self.batch_cooldown_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            db_path: PathBuf::from(DB_PATH),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            timeout_seconds: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            screenshot_api_url: None,
            screenshot_api_key: None,
            storage_upload_url: None,
            storage_api_key: None,
            llm_api_url: "https://api.openai.com/v1".to_string(),
            llm_api_key: None,
            llm_model: "gpt-4o-mini".to_string(),
            whois_api_url: None,
            whois_api_key: None,
            whois_cache_dir: None,
            email_api_url: None,
            email_api_key: None,
            email_from: "notices@localhost".to_string(),
            notary_calendar_url: DEFAULT_NOTARY_CALENDAR_URL.to_string(),
            esplora_url: DEFAULT_ESPLORA_URL.to_string(),
            disable_timestamps: false,
            wayback_url: DEFAULT_WAYBACK_URL.to_string(),
            disable_wayback: false,
            crm_webhook_url: None,
            queue_secret: None,
            stagger_interval_secs: STAGGER_INTERVAL_SECS,
            batch_cooldown_secs: BATCH_COOLDOWN_SECS,
            max_batch_items: MAX_BATCH_ITEMS,
            filter_min_confidence: DEFAULT_MIN_CONFIDENCE,
            filter_uncertain_floor: UNCERTAIN_CONFIDENCE_FLOOR,
            queue_poll_interval_secs: QUEUE_POLL_INTERVAL_SECS,
            timestamp_upgrade_interval_secs: TIMESTAMP_UPGRADE_INTERVAL_SECS,
            audit_buffer_size: AUDIT_BUFFER_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_config_default_matches_product_constants() {
        let config = Config::default();
        assert_eq!(config.stagger_interval(), Duration::from_secs(180));
        assert_eq!(config.batch_cooldown(), Duration::from_secs(300));
        assert_eq!(config.max_batch_items, 50);
        assert_eq!(config.filter_uncertain_floor, 0.5);
        assert!(config.queue_secret.is_none());
        assert_eq!(config.db_path, PathBuf::from("./takedown_pipeline.db"));
    }
}
