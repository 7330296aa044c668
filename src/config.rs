use anyhow::Result;
use dotenvy::dotenv;
use std::env;

/// What the retention sweep does with expired rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveMode {
    /// Copy expired rows into the archive table, then delete them.
    ArchiveThenDelete,
    /// Delete expired rows without keeping a copy.
    DeleteOnly,
}

impl ArchiveMode {
    fn from_env_value(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "delete" | "delete_only" => Self::DeleteOnly,
            _ => Self::ArchiveThenDelete,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sync_token: String,
    pub feed_base_url: String,
    pub feed_board_id: String,
    pub feed_timeout_secs: u64,
    pub feed_max_pages: u32,
    pub sync_batch_size: usize,
    pub retention_days: i64,
    pub archive_mode: ArchiveMode,
    pub imgur_upload_url: String,
    pub imgur_client_id: String,
    pub vault_upload_url: String,
    pub geocode_url: String,
    pub geocode_user_agent: String,
    pub http_bind: String,
    pub database_url: String,
    pub log_level: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let sync_token = env::var("SYNC_TOKEN").unwrap_or_else(|_| "123".to_string());

        let feed_base_url = env::var("FEED_BASE_URL")
            .unwrap_or_else(|_| "https://padlet.com/api/10/wishes".to_string());
        let feed_board_id =
            env::var("FEED_BOARD_ID").unwrap_or_else(|_| "board_YjMXnWQK1VbayND5".to_string());
        let feed_timeout_secs = env::var("FEED_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let feed_max_pages = env::var("FEED_MAX_PAGES")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        let sync_batch_size = env::var("SYNC_BATCH_SIZE")
            .unwrap_or_else(|_| "25".to_string())
            .parse()
            .unwrap_or(25);
        let retention_days = env::var("RETENTION_DAYS")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .unwrap_or(3);
        let archive_mode = ArchiveMode::from_env_value(
            &env::var("ARCHIVE_MODE").unwrap_or_else(|_| "archive".to_string()),
        );

        let imgur_upload_url = env::var("IMGUR_UPLOAD_URL")
            .unwrap_or_else(|_| "https://api.imgur.com/3/image".to_string());
        let imgur_client_id = env::var("IMGUR_CLIENT_ID").unwrap_or_default();
        let vault_upload_url = env::var("VAULT_UPLOAD_URL").unwrap_or_default();

        let geocode_url = env::var("GEOCODE_URL")
            .unwrap_or_else(|_| "https://nominatim.openstreetmap.org/reverse".to_string());
        let geocode_user_agent =
            env::var("GEOCODE_USER_AGENT").unwrap_or_else(|_| "sightings-sync/1.0".to_string());

        let http_bind = env::var("HTTP_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
        let db_name = env::var("DB_DATABASE").unwrap_or_else(|_| "sightings".to_string());
        let db_user = env::var("DB_USER").unwrap_or_else(|_| "sightings".to_string());
        let db_pwd = env::var("DB_PWD").unwrap_or_else(|_| "sightings".to_string());

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            db_user, db_pwd, db_host, db_port, db_name
        );

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            sync_token,
            feed_base_url,
            feed_board_id,
            feed_timeout_secs,
            feed_max_pages,
            sync_batch_size,
            retention_days,
            archive_mode,
            imgur_upload_url,
            imgur_client_id,
            vault_upload_url,
            geocode_url,
            geocode_user_agent,
            http_bind,
            database_url,
            log_level,
        })
    }
}
