//! Application configuration loaded from the environment

use std::env;

/// Runtime environment of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Runtime environment (`APP_ENV`, default production)
    pub env: AppEnv,
    /// Port the HTTP server binds to (`PORT`, default 5000)
    pub port: u16,
    /// Public base URL used in emailed links (`APP_PUBLIC_URL`)
    pub public_url: String,
    /// Lifetime of the mirrored jwt cookie in days (`JWT_COOKIE_MAX_AGE`)
    pub cookie_max_age_days: i64,
    /// Directory uploaded bootcamp photos are written to (`FILE_UPLOAD_PATH`)
    pub file_upload_path: String,
    /// Maximum accepted upload size in bytes (`MAX_FILE_UPLOAD`)
    pub max_file_upload: usize,
}

impl AppConfig {
    /// Create a new AppConfig from environment variables
    pub fn from_env() -> Self {
        let env_kind = match env::var("APP_ENV").as_deref() {
            Ok("development") => AppEnv::Development,
            _ => AppEnv::Production,
        };

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5000);

        let public_url =
            env::var("APP_PUBLIC_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

        let cookie_max_age_days = env::var("JWT_COOKIE_MAX_AGE")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n: &i64| *n > 0)
            .unwrap_or(30);

        let file_upload_path =
            env::var("FILE_UPLOAD_PATH").unwrap_or_else(|_| "public/uploads".to_string());

        let max_file_upload = env::var("MAX_FILE_UPLOAD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1_000_000);

        AppConfig {
            env: env_kind,
            port,
            public_url,
            cookie_max_age_days,
            file_upload_path,
            max_file_upload,
        }
    }

    pub fn is_development(&self) -> bool {
        self.env == AppEnv::Development
    }
}
