//! Process configuration, resolved once at startup from environment
//! variables. Every value has a default so a dev instance starts bare; the
//! resolved configuration is logged by the binary on startup.

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub region: String,
    pub bucket: String,
    /// Object key of the single list document.
    pub list_key: String,
    /// Name (or ARN) of the group decision function.
    pub verify_fn: String,
    /// Role flag required to append; the decision function's vocabulary.
    pub write_role: String,
    pub session_ttl_secs: u64,
    pub append_max_attempts: u32,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            http_port: var_or("PANTRY_HTTP_PORT", "3001").parse().unwrap_or(3001),
            region: var_or("AWS_REGION", "us-east-1"),
            bucket: var_or("PANTRY_S3_BUCKET", "pantry-list"),
            list_key: var_or("PANTRY_LIST_KEY", "grocery-list.json"),
            verify_fn: var_or("PANTRY_VERIFY_FN", "verifyGroup"),
            write_role: var_or("PANTRY_WRITE_ROLE", "is_shopper"),
            session_ttl_secs: var_or("PANTRY_SESSION_TTL_SECS", "3600").parse().unwrap_or(3600),
            append_max_attempts: var_or("PANTRY_APPEND_ATTEMPTS", "4").parse().unwrap_or(4),
        }
    }
}
