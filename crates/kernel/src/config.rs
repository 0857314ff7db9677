//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Path to uploads directory (default: ./uploads).
    pub uploads_dir: PathBuf,

    /// Directory for generated content previews, under uploads (default: previews).
    pub previews_dir: String,

    /// Path to the export template directory (default: ./templates).
    pub templates_dir: PathBuf,

    /// Base URL for serving uploaded files (default: /files).
    pub files_url: String,

    /// LaTeX compiler binary (default: pdflatex).
    pub latex_bin: PathBuf,

    /// PDF rasterizer binary used for previews (default: pdftoppm).
    pub rasterizer_bin: PathBuf,

    /// Seconds to wait for one compiler pass before killing it (default: 60).
    pub latex_timeout_secs: u64,

    /// Header carrying the SSO-authenticated username (default: x-forwarded-user).
    pub auth_user_header: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let uploads_dir = env::var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        let previews_dir = env::var("PREVIEWS_DIR").unwrap_or_else(|_| "previews".to_string());

        let templates_dir = env::var("TEMPLATES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./templates"));

        let files_url = env::var("FILES_URL").unwrap_or_else(|_| "/files".to_string());

        let latex_bin = env::var("LATEX_BIN")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("pdflatex"));

        let rasterizer_bin = env::var("RASTERIZER_BIN")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("pdftoppm"));

        let latex_timeout_secs = env::var("LATEX_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("LATEX_TIMEOUT_SECS must be a valid u64")?;

        let auth_user_header = env::var("AUTH_USER_HEADER")
            .unwrap_or_else(|_| "x-forwarded-user".to_string())
            .to_lowercase();

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            uploads_dir,
            previews_dir,
            templates_dir,
            files_url,
            latex_bin,
            rasterizer_bin,
            latex_timeout_secs,
            auth_user_header,
        })
    }
}
