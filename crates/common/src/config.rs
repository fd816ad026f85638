/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// JWT secret shared with the authentication service
    pub jwt_secret: String,

    /// JWT token expiry in hours
    pub jwt_expiry_hours: u64,

    /// Port the API server listens on (default: 3000)
    pub api_port: u16,

    /// Resend API key for email delivery
    pub resend_api_key: Option<String>,

    /// Email sender address
    pub email_from: Option<String>,

    /// Number of notification delivery workers (default: 4)
    pub notifier_workers: usize,

    /// Capacity of the in-memory dispatch queue (default: 1000)
    pub notifier_queue_capacity: usize,

    /// Seconds between retry scheduler sweeps (default: 120)
    pub notifier_retry_interval_secs: u64,

    /// Age in seconds after which a never-attempted notification is
    /// considered orphaned and re-queued by the scheduler (default: 60)
    pub notifier_orphan_grace_secs: u64,

    /// Delivery attempts allowed when a producer does not specify one (default: 3)
    pub notifier_max_retries: i32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 20)?,
            jwt_secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?,
            jwt_expiry_hours: parse_var("JWT_EXPIRY_HOURS", 24)?,
            api_port: parse_var("API_PORT", 3000)?,
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            email_from: std::env::var("EMAIL_FROM").ok(),
            notifier_workers: parse_var("NOTIFIER_WORKERS", 4)?,
            notifier_queue_capacity: parse_var("NOTIFIER_QUEUE_CAPACITY", 1000)?,
            notifier_retry_interval_secs: parse_var("NOTIFIER_RETRY_INTERVAL_SECS", 120)?,
            notifier_orphan_grace_secs: parse_var("NOTIFIER_ORPHAN_GRACE_SECS", 60)?,
            notifier_max_retries: parse_var("NOTIFIER_MAX_RETRIES", 3)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations the notifier cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.notifier_workers == 0 {
            anyhow::bail!("NOTIFIER_WORKERS must be at least 1");
        }
        if self.notifier_queue_capacity == 0 {
            anyhow::bail!("NOTIFIER_QUEUE_CAPACITY must be at least 1");
        }
        if self.notifier_retry_interval_secs == 0 {
            anyhow::bail!("NOTIFIER_RETRY_INTERVAL_SECS must be at least 1");
        }
        if self.notifier_max_retries < 1 {
            anyhow::bail!("NOTIFIER_MAX_RETRIES must be at least 1");
        }
        if self.resend_api_key.is_some() && self.email_from.is_none() {
            anyhow::bail!("EMAIL_FROM is required when RESEND_API_KEY is set");
        }
        Ok(())
    }
}

/// Read an optional variable, falling back to `default` when it is unset.
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            anyhow::anyhow!(
                "{} must be a valid {}",
                name,
                std::any::type_name::<T>()
            )
        }),
        Err(_) => Ok(default),
    }
}
