use crate::error::CatalogError;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_ADDR: &str = "0.0.0.0:3147";
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Most recent search queries kept in history.
pub const HISTORY_LIMIT: usize = 10;
/// Upper bound on a single catalog request, body included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: String,
    pub api_base_url: String,
    pub image_base_url: String,
    pub language: String,
    pub data_dir: PathBuf,
    pub addr: SocketAddr,
    pub request_timeout: Duration,
    pub history_limit: usize,
}

impl Config {
    /// Reads configuration from the process environment. Call `dotenvy::dotenv()` first
    /// if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, CatalogError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, CatalogError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_token = non_empty("TMDB_API_TOKEN").ok_or_else(|| {
            CatalogError::Configuration(
                "TMDB_API_TOKEN must be set to a TMDB v4 read access token".to_string(),
            )
        })?;

        let addr_raw = non_empty("CINESHELF_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_raw.parse::<SocketAddr>().map_err(|e| {
            CatalogError::Configuration(format!("CINESHELF_ADDR '{}' is invalid: {}", addr_raw, e))
        })?;

        Ok(Self {
            api_token,
            api_base_url: trim_base(
                non_empty("TMDB_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            ),
            image_base_url: trim_base(
                non_empty("TMDB_IMAGE_BASE_URL").unwrap_or_else(|| DEFAULT_IMAGE_BASE.to_string()),
            ),
            language: DEFAULT_LANGUAGE.to_string(),
            data_dir: PathBuf::from(
                non_empty("CINESHELF_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            ),
            addr,
            request_timeout: REQUEST_TIMEOUT,
            history_limit: HISTORY_LIMIT,
        })
    }

    /// Config for mocked catalog servers; never reads the environment.
    pub fn for_tests(api_base_url: &str) -> Self {
        Self {
            api_token: "test-token".to_string(),
            api_base_url: trim_base(api_base_url.to_string()),
            image_base_url: DEFAULT_IMAGE_BASE.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            request_timeout: REQUEST_TIMEOUT,
            history_limit: HISTORY_LIMIT,
        }
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
