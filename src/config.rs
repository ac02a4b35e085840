use std::env;

/// Server configuration, read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub seed_on_start: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("SERVER_PORT must be a valid u16: {e}"))?;
        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a number: {e}"))?;

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://media_forum.db".to_string()),
            db_max_connections,
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            seed_on_start: env::var("SEED_ON_START")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

const DEFAULT_API_BASE_URL: &str = "http://localhost:4000/api";

/// Where the client core finds the collaborator API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
}

impl ClientConfig {
    pub fn new(api_base_url: &str) -> Self {
        let trimmed = api_base_url.trim().trim_end_matches('/');
        let api_base_url = if trimmed.is_empty() {
            DEFAULT_API_BASE_URL.to_string()
        } else {
            trimmed.to_string()
        };
        Self { api_base_url }
    }

    pub fn from_env() -> Self {
        Self::new(&env::var("API_BASE_URL").unwrap_or_default())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}
