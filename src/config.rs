use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub host: String,
    pub upload_dir: String,
    pub public_base_url: String,
    pub max_file_size: usize,
    pub allowed_origins: Vec<String>,
    pub allowed_download_hosts: Vec<String>,
    pub rawg_api_url: String,
    pub rawg_api_key: Option<String>,
    pub health_check_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            jwt_secret: env::var("JWT_SECRET")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            max_file_size: env::var("MAX_FILE_SIZE")
                .unwrap_or_else(|_| "10485760".to_string()) // 10MB default
                .parse()
                .unwrap_or(10485760),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:8080".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            allowed_download_hosts: env::var("ALLOWED_DOWNLOAD_HOSTS")
                .unwrap_or_else(|_| {
                    "drive.google.com,dropbox.com,mega.nz,mediafire.com,1drv.ms".to_string()
                })
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            rawg_api_url: env::var("RAWG_API_URL")
                .unwrap_or_else(|_| "https://api.rawg.io/api".to_string()),
            rawg_api_key: env::var("RAWG_API_KEY").ok(),
            health_check_interval_secs: env::var("HEALTH_CHECK_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
        })
    }
}
