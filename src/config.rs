use std::env;

use crate::error::AppError;

const DEFAULT_DATABASE_URL: &str = "sqlite:./jobportal.sqlite?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_STORAGE_API_URL: &str = "https://api.uploadthing.com/v6/deleteFiles";
const DEFAULT_AI_API_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_AI_MODEL: &str = "gemini-2.0-flash-exp";

/// Runtime configuration, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub auth: AuthSettings,
    pub storage: Option<StorageSettings>,
    pub smtp: Option<SmtpSettings>,
    pub ai: Option<AiSettings>,
    /// Requests per minute per client IP; `None` disables rate limiting
    pub rate_limit_per_minute: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Shared HS256 secret used by the identity provider to sign session tokens
    pub jwt_secret: String,
    pub issuer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub api_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct AiSettings {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from_name: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env (if present) so values from file are visible
        let _ = dotenvy::dotenv();

        let jwt_secret = non_empty("AUTH_JWT_SECRET")
            .ok_or_else(|| AppError::InternalError("AUTH_JWT_SECRET must be set".to_string()))?;

        let storage = non_empty("UPLOADTHING_SECRET").map(|api_key| StorageSettings {
            api_url: non_empty("UPLOADTHING_API_URL")
                .unwrap_or_else(|| DEFAULT_STORAGE_API_URL.to_string()),
            api_key,
        });

        let smtp = match (non_empty("SMTP_EMAIL"), non_empty("SMTP_PASSWORD")) {
            (Some(username), Some(password)) => Some(SmtpSettings {
                host: non_empty("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                username,
                password,
                from_name: non_empty("MAIL_FROM_NAME").unwrap_or_else(|| "Job Portal".to_string()),
            }),
            _ => None,
        };

        let ai = non_empty("GEMINI_API_KEY").map(|api_key| AiSettings {
            api_url: non_empty("GEMINI_API_URL").unwrap_or_else(|| DEFAULT_AI_API_URL.to_string()),
            api_key,
            model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
        });

        let rate_limit_per_minute = match non_empty("RATE_LIMIT_PER_MINUTE") {
            Some(raw) => Some(raw.parse::<u32>().map_err(|_| {
                AppError::InternalError(format!("RATE_LIMIT_PER_MINUTE is not a number: {}", raw))
            })?),
            None => None,
        };

        Ok(Self {
            database_url: non_empty("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            auth: AuthSettings {
                jwt_secret,
                issuer: non_empty("AUTH_ISSUER"),
            },
            storage,
            smtp,
            ai,
            rate_limit_per_minute: rate_limit_per_minute.filter(|n| *n > 0),
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
