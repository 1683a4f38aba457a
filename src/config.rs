use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_body_size: usize,
    pub log_level: String,
    pub self_heal: SelfHealMode,
}

/// Whether a read that finds stale stored progress writes the derived value back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfHealMode {
    Off,
    /// Update only if the row still holds the values that were read.
    CompareAndSet,
}

impl SelfHealMode {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "off" | "false" | "0" => Ok(SelfHealMode::Off),
            "compare-and-set" | "cas" | "on" | "true" | "1" => Ok(SelfHealMode::CompareAndSet),
            other => Err(format!("Invalid RENOTRACK_SELF_HEAL: {other}")),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("RENOTRACK_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid RENOTRACK_HOST: {e}"))?;

        let port: u16 = env_or("RENOTRACK_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid RENOTRACK_PORT: {e}"))?;

        let max_body_size: usize = env_or("RENOTRACK_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid RENOTRACK_MAX_BODY_SIZE: {e}"))?;

        let log_level = env_or("RENOTRACK_LOG_LEVEL", "info");

        let self_heal = SelfHealMode::parse(&env_or("RENOTRACK_SELF_HEAL", "off"))?;

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            max_body_size,
            log_level,
            self_heal,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
