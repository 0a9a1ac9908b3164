use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // AI chat-completion endpoint (OpenAI-compatible)
    pub ai_api_key: String,
    pub ai_base_url: String,
    pub ai_model: String,

    // LINE channel
    pub line_channel_secret: String,
    pub line_channel_access_token: String,

    // Pseudonymization
    pub pseudonym_salt: String,

    // Web server
    pub api_host: String,
    pub api_port: u16,

    // Staff auth
    pub jwt_secret: String,
    pub admin_username: String,
    pub admin_password: String,

    /// Course questions fall into when the webhook can't resolve a class
    /// from the chat source. Empty disables webhook question creation.
    pub default_course_id: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            ai_api_key: required_env("AI_API_KEY"),
            ai_base_url: env::var("AI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            ai_model: env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            line_channel_secret: required_env("LINE_CHANNEL_SECRET"),
            line_channel_access_token: required_env("LINE_CHANNEL_ACCESS_TOKEN"),
            pseudonym_salt: required_env("PSEUDONYM_SALT"),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("API_PORT must be a number"),
            jwt_secret: required_env("JWT_SECRET"),
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            admin_password: required_env("ADMIN_PASSWORD"),
            default_course_id: env::var("DEFAULT_COURSE_ID").unwrap_or_default(),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
