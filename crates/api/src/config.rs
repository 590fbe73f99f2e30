use liftlog_core::rate_limit::{RateLimitConfig, DEFAULT_MOBILE_DAILY_QUOTA, DEFAULT_WEB_DAILY_QUOTA};

/// Server configuration loaded from environment variables.
///
/// Everything except `PLAN_GENERATOR_URL` has a default suitable for local
/// development. Verification credentials are loaded separately by
/// [`liftlog_verification::config::VerificationConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `120`). Plan generation is slow.
    pub request_timeout_secs: u64,
    /// Upper bound on pooled database connections (default: `20`).
    pub database_max_connections: u32,
    /// Base URL of the upstream plan generator.
    pub plan_generator_url: String,
    /// Daily quotas and the test-only bypass switch.
    pub rate_limit: RateLimitConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                    |
    /// |-----------------------------|----------------------------|
    /// | `HOST`                      | `0.0.0.0`                  |
    /// | `PORT`                      | `3000`                     |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`      | `120`                      |
    /// | `DATABASE_MAX_CONNECTIONS`  | `20`                       |
    /// | `PLAN_GENERATOR_URL`        | **required**               |
    /// | `RATE_LIMIT_WEB_PER_DAY`    | `100`                      |
    /// | `RATE_LIMIT_MOBILE_PER_DAY` | `20`                       |
    /// | `RATE_LIMIT_BYPASS`         | `false` (`TEST_MODE` too)  |
    ///
    /// # Panics
    ///
    /// Panics if `PLAN_GENERATOR_URL` is unset or any value fails to parse.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let database_max_connections: u32 = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "20".into())
            .parse()
            .expect("DATABASE_MAX_CONNECTIONS must be a valid u32");

        let plan_generator_url = std::env::var("PLAN_GENERATOR_URL")
            .expect("PLAN_GENERATOR_URL must be set in the environment")
            .trim_end_matches('/')
            .to_string();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            database_max_connections,
            plan_generator_url,
            rate_limit: rate_limit_from_env(),
        }
    }
}

fn rate_limit_from_env() -> RateLimitConfig {
    let web_daily_quota: i64 = std::env::var("RATE_LIMIT_WEB_PER_DAY")
        .unwrap_or_else(|_| DEFAULT_WEB_DAILY_QUOTA.to_string())
        .parse()
        .expect("RATE_LIMIT_WEB_PER_DAY must be a valid i64");

    let mobile_daily_quota: i64 = std::env::var("RATE_LIMIT_MOBILE_PER_DAY")
        .unwrap_or_else(|_| DEFAULT_MOBILE_DAILY_QUOTA.to_string())
        .parse()
        .expect("RATE_LIMIT_MOBILE_PER_DAY must be a valid i64");

    assert!(
        web_daily_quota >= 0 && mobile_daily_quota >= 0,
        "rate limit quotas must not be negative"
    );

    let bypass = ["RATE_LIMIT_BYPASS", "TEST_MODE"]
        .iter()
        .any(|name| std::env::var(name).is_ok_and(|v| parse_flag(&v)));

    RateLimitConfig {
        web_daily_quota,
        mobile_daily_quota,
        bypass,
    }
}

/// `true`, `1` and `yes` (any case) switch a flag on.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}
