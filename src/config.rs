use serde::Deserialize;
use time::Duration;

/// Two weeks, in minutes.
const DEFAULT_SESSION_TIMEOUT_MINUTES: i64 = 60 * 24 * 14;

/// Source of the remember-me lifetime.
pub trait SessionSettings: Send + Sync {
    fn session_timeout(&self) -> Duration;
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub timeout_minutes: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: DEFAULT_SESSION_TIMEOUT_MINUTES,
        }
    }
}

impl SessionSettings for SessionConfig {
    fn session_timeout(&self) -> Duration {
        Duration::minutes(self.timeout_minutes)
    }
}

/// Argon2 cost parameters. Defaults match `argon2::Params::DEFAULT`.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    pub password: PasswordConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let defaults = PasswordConfig::default();
        let session = SessionConfig {
            timeout_minutes: env_or("SESSION_TIMEOUT_MINUTES", DEFAULT_SESSION_TIMEOUT_MINUTES),
        };
        anyhow::ensure!(
            session.timeout_minutes > 0,
            "SESSION_TIMEOUT_MINUTES must be positive"
        );
        let password = PasswordConfig {
            memory_kib: env_or("ARGON2_MEMORY_KIB", defaults.memory_kib),
            iterations: env_or("ARGON2_ITERATIONS", defaults.iterations),
            parallelism: env_or("ARGON2_PARALLELISM", defaults.parallelism),
        };
        Ok(Self {
            database_url,
            session,
            password,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
