use std::env;

/// Signing and transport settings for session tokens.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub secret: String,
    /// Token lifetime in seconds.
    pub expiry: i64,
    pub cookie_name: String,
    pub secure_cookie: bool,
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env::var("SESSION_SECRET")
                .unwrap_or_else(|_| "atrium-development-secret-change-me".to_string()),
            expiry: env::var("SESSION_EXPIRY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(86400), // 1 day
            cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "atrium_session".to_string()),
            secure_cookie: crate::env_flag("SESSION_COOKIE_SECURE", false),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: "atrium-development-secret-change-me".to_string(),
            expiry: 86400,
            cookie_name: "atrium_session".to_string(),
            secure_cookie: false,
        }
    }
}
