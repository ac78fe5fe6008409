use crate::config::Config;
use crate::error::CatalogError;
use crate::models::{Movie, MovieDetails, PagedResult, Validate};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const PLACEHOLDER_POSTER: &str = "/static/placeholder-poster.svg";
pub const PLACEHOLDER_BACKDROP: &str = "/static/placeholder-backdrop.svg";
const POSTER_SIZE: &str = "w500";
const BACKDROP_SIZE: &str = "original";

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn popular_movies(&self, page: u32) -> Result<PagedResult<Movie>, CatalogError>;
    async fn search_movies(
        &self,
        query: &str,
        page: u32,
    ) -> Result<PagedResult<Movie>, CatalogError>;
    async fn movie_details(&self, id: u64) -> Result<MovieDetails, CatalogError>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    language: String,
    timeout: Duration,
}

impl TmdbClient {
    pub fn new(config: &Config) -> Result<Self, CatalogError> {
        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", config.api_token))
            .map_err(|_| {
                CatalogError::Configuration(
                    "TMDB_API_TOKEN contains invalid characters".to_string(),
                )
            })?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let user_agent = format!("cineshelf/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()
            .map_err(|e| CatalogError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            language: config.language.clone(),
            timeout: config.request_timeout,
        })
    }

    /// One GET against the catalog. The timeout covers the body read too, so a
    /// server that stalls mid-body still ends in `Timeout`.
    async fn get_json<T>(&self, path: &str, query: &str) -> Result<T, CatalogError>
    where
        T: DeserializeOwned + Validate,
    {
        let url = format!("{}/{}?{}", self.base_url, path, query);
        debug!(%url, "Catalog request");

        let fetched = tokio::time::timeout(self.timeout, self.fetch_text(&url)).await;
        let (status, text) = match fetched {
            Ok(res) => res?,
            Err(_) => {
                warn!(%url, "Catalog request timed out after {:?}", self.timeout);
                return Err(CatalogError::Timeout {
                    after: self.timeout,
                });
            }
        };

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.status_message)
                .unwrap_or(text);
            warn!(%url, status = status.as_u16(), "Catalog returned an error: {}", message);
            return Err(CatalogError::Remote {
                status: Some(status.as_u16()),
                message,
            });
        }

        if text.trim().is_empty() {
            return Err(CatalogError::EmptyResponse(format!("{path}: empty body")));
        }
        let parsed: T = serde_json::from_str(&text)
            .map_err(|e| CatalogError::EmptyResponse(format!("{path}: {e}")))?;
        parsed
            .validate()
            .map_err(|e| CatalogError::EmptyResponse(format!("{path}: {e}")))?;
        Ok(parsed)
    }

    async fn fetch_text(&self, url: &str) -> Result<(reqwest::StatusCode, String), CatalogError> {
        let res = self.client.get(url).send().await.map_err(transport_error)?;
        let status = res.status();
        let text = res.text().await.map_err(transport_error)?;
        Ok((status, text))
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn popular_movies(&self, page: u32) -> Result<PagedResult<Movie>, CatalogError> {
        let page = page.max(1);
        let query = format!("language={}&page={}", self.language, page);
        self.get_json("movie/popular", &query).await
    }

    async fn search_movies(
        &self,
        query: &str,
        page: u32,
    ) -> Result<PagedResult<Movie>, CatalogError> {
        let page = page.max(1);
        let query = format!(
            "query={}&include_adult=false&language={}&page={}",
            urlencoding::encode(query),
            self.language,
            page
        );
        self.get_json("search/movie", &query).await
    }

    async fn movie_details(&self, id: u64) -> Result<MovieDetails, CatalogError> {
        if id == 0 {
            return Err(CatalogError::InvalidId(id));
        }
        let query = format!("language={}", self.language);
        self.get_json(&format!("movie/{id}"), &query).await
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    status_message: Option<String>,
}

fn transport_error(e: reqwest::Error) -> CatalogError {
    CatalogError::Remote {
        status: e.status().map(|s| s.as_u16()),
        message: e.to_string(),
    }
}

/// Turns TMDB image paths into absolute URLs, falling back to bundled
/// placeholders when a movie has no artwork.
#[derive(Debug, Clone)]
pub struct ImageUrls {
    base: String,
}

impl ImageUrls {
    pub fn new(image_base_url: &str) -> Self {
        Self {
            base: image_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn poster_url(&self, path: Option<&str>) -> String {
        self.resolve(path, POSTER_SIZE, PLACEHOLDER_POSTER)
    }

    pub fn backdrop_url(&self, path: Option<&str>) -> String {
        self.resolve(path, BACKDROP_SIZE, PLACEHOLDER_BACKDROP)
    }

    fn resolve(&self, path: Option<&str>, size: &str, placeholder: &str) -> String {
        match path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) if p.starts_with('/') => format!("{}/{}{}", self.base, size, p),
            Some(p) => format!("{}/{}/{}", self.base, size, p),
            None => placeholder.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images() -> ImageUrls {
        ImageUrls::new("https://image.tmdb.org/t/p/")
    }

    #[test]
    fn missing_poster_uses_placeholder() {
        assert_eq!(images().poster_url(None), PLACEHOLDER_POSTER);
        assert_eq!(images().poster_url(Some("")), PLACEHOLDER_POSTER);
        assert_eq!(images().backdrop_url(Some("  ")), PLACEHOLDER_BACKDROP);
    }

    #[test]
    fn poster_path_is_prefixed_with_image_base() {
        assert_eq!(
            images().poster_url(Some("/abc.jpg")),
            "https://image.tmdb.org/t/p/w500/abc.jpg"
        );
        assert_eq!(
            images().backdrop_url(Some("/abc.jpg")),
            "https://image.tmdb.org/t/p/original/abc.jpg"
        );
    }

    #[test]
    fn path_without_leading_slash_gets_one() {
        assert_eq!(
            images().poster_url(Some("abc.jpg")),
            "https://image.tmdb.org/t/p/w500/abc.jpg"
        );
    }

    #[tokio::test]
    async fn zero_id_is_rejected_without_a_request() {
        // Port 9 (discard) would refuse the connection; InvalidId must come first.
        let client = TmdbClient::new(&Config::for_tests("http://127.0.0.1:9")).unwrap();
        let err = client.movie_details(0).await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidId(0)));
    }

    #[test]
    fn token_with_newline_is_a_configuration_error() {
        let mut config = Config::for_tests("http://localhost");
        config.api_token = "bad\ntoken".to_string();
        assert!(matches!(
            TmdbClient::new(&config),
            Err(CatalogError::Configuration(_))
        ));
    }
}
