use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_days: i64,
    /// Emails that receive the admin role when they sign up
    pub admin_emails: Vec<String>,
    pub fcm_server_key: Option<String>,
    /// Directory backing the `news-images` bucket
    pub storage_root: String,
    /// Base URL used to build public image URLs
    pub public_base_url: String,
    pub allowed_origins: Vec<String>,
    pub scheduler_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "newsdesk".to_string()),
            access_token_ttl_secs: env::var("ACCESS_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .context("ACCESS_TOKEN_TTL_SECS must be a valid number")?,
            refresh_token_ttl_days: env::var("REFRESH_TOKEN_TTL_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("REFRESH_TOKEN_TTL_DAYS must be a valid number")?,
            admin_emails: parse_list(&env::var("ADMIN_EMAILS").unwrap_or_default())
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect(),
            fcm_server_key: env::var("FCM_SERVER_KEY").ok().filter(|k| !k.is_empty()),
            storage_root: env::var("STORAGE_ROOT").unwrap_or_else(|_| "./storage".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            allowed_origins: parse_list(&env::var("ALLOWED_ORIGINS").unwrap_or_default()),
            scheduler_enabled: env::var("SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        })
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
