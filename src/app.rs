use crate::config::Config;
use crate::error::CatalogError;
use crate::models::{Movie, Validate};
use crate::routes::Route;
use crate::storage::{FileStorage, Storage};
use crate::store::LibraryStore;
use crate::tmdb::{ImageUrls, TmdbApi, TmdbClient};
use crate::views::{
    DetailCache, DetailPanel, ErrorPanel, FavoritesPage, HistoryPage, Listing, ListingPage,
    ListingSource, NotFoundPage,
};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub tmdb: Arc<dyn TmdbApi>,
    /// Mutations write two small JSON files synchronously under this lock.
    /// Single-user store, so blocking the handler for that write is accepted.
    pub store: Arc<Mutex<LibraryStore>>,
    pub images: Arc<ImageUrls>,
    pub details: Arc<DetailCache>,
}

impl AppState {
    pub fn new(tmdb: Arc<dyn TmdbApi>, store: LibraryStore, images: ImageUrls) -> Self {
        Self {
            tmdb,
            store: Arc::new(Mutex::new(store)),
            images: Arc::new(images),
            details: Arc::new(DetailCache::new()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
    page: Option<u32>,
}

pub async fn run_server(config: Config) -> Result<()> {
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::new(&config)?);
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(&config.data_dir));
    let store = LibraryStore::load_with_limit(storage, config.history_limit);
    info!(
        "Loaded {} favorites and {} recent searches from {}",
        store.favorite_count(),
        store.search_history().len(),
        config.data_dir.display()
    );

    let state = AppState::new(tmdb, store, ImageUrls::new(&config.image_base_url));
    let app = build_router(state).layer(tower_http::trace::TraceLayer::new_for_http());

    info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(popular))
        .route("/search", get(search))
        .route("/movie/:id", get(movie_detail))
        .route(
            "/favorites",
            get(favorites).post(add_favorite).delete(clear_favorites),
        )
        .route("/favorites/:id", delete(remove_favorite))
        .route("/history", get(history).delete(clear_history))
        .route("/health", get(health))
        .fallback(not_found)
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn popular(State(state): State<AppState>, Query(params): Query<PageQuery>) -> Response {
    let mut listing = Listing::new(ListingSource::Popular);
    listing
        .load_at(state.tmdb.as_ref(), params.page.unwrap_or(1))
        .await;
    render_listing(&state, &listing).await
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchQuery>) -> Response {
    let query = params.q.unwrap_or_default().trim().to_string();
    let page = params.page.unwrap_or(1).max(1);
    let mut listing = Listing::new(ListingSource::Search(query.clone()));

    if query.is_empty() {
        debug!("Empty search query, skipping catalog call");
        return render_listing(&state, &listing).await;
    }
    if page == 1 {
        state.store.lock().await.add_to_search_history(&query);
    }
    info!("Searching catalog for '{}' (page {})", query, page);
    listing.load_at(state.tmdb.as_ref(), page).await;
    render_listing(&state, &listing).await
}

async fn render_listing(state: &AppState, listing: &Listing) -> Response {
    let status = listing.error().map(status_for).unwrap_or(StatusCode::OK);
    let store = state.store.lock().await;
    let view = ListingPage::render(listing, &store, &state.images);
    (status, Json(view)).into_response()
}

async fn movie_detail(State(state): State<AppState>, uri: Uri) -> Response {
    let id = match Route::parse(uri.path()) {
        Route::Movie { id } => id,
        _ => return not_found(uri).await,
    };

    let details = match state.details.get(id) {
        Some(cached) => cached,
        None => match state.tmdb.movie_details(id).await {
            Ok(fetched) => {
                state.details.insert(fetched.clone());
                fetched
            }
            Err(e) => {
                warn!("Failed to load details for movie {}: {}", id, e);
                let panel = ErrorPanel::new(&e, Some(Route::Movie { id }));
                return (status_for(&e), Json(json!({ "error": panel }))).into_response();
            }
        },
    };

    let is_favorite = state.store.lock().await.is_favorite(id);
    Json(DetailPanel::new(&details, is_favorite, &state.images)).into_response()
}

async fn favorites(State(state): State<AppState>) -> Json<FavoritesPage> {
    let store = state.store.lock().await;
    Json(FavoritesPage::render(&store, &state.images))
}

async fn add_favorite(State(state): State<AppState>, Json(movie): Json<Movie>) -> Response {
    if let Err(reason) = movie.validate() {
        warn!("Rejecting favorite: {}", reason);
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": reason })),
        )
            .into_response();
    }
    let mut store = state.store.lock().await;
    info!("Adding '{}' ({}) to favorites", movie.title, movie.id);
    store.add_to_favorites(movie);
    Json(FavoritesPage::render(&store, &state.images)).into_response()
}

async fn remove_favorite(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Json<FavoritesPage> {
    let mut store = state.store.lock().await;
    store.remove_from_favorites(id);
    Json(FavoritesPage::render(&store, &state.images))
}

async fn clear_favorites(State(state): State<AppState>) -> Json<FavoritesPage> {
    let mut store = state.store.lock().await;
    store.clear_favorites();
    info!("Cleared favorites");
    Json(FavoritesPage::render(&store, &state.images))
}

async fn history(State(state): State<AppState>) -> Json<HistoryPage> {
    let store = state.store.lock().await;
    Json(HistoryPage::render(&store))
}

async fn clear_history(State(state): State<AppState>) -> Json<HistoryPage> {
    let mut store = state.store.lock().await;
    store.clear_search_history();
    Json(HistoryPage::render(&store))
}

async fn not_found(uri: Uri) -> Response {
    debug!("No route for {}", uri.path());
    (StatusCode::NOT_FOUND, Json(NotFoundPage::new(uri.path()))).into_response()
}

fn status_for(error: &CatalogError) -> StatusCode {
    match error {
        CatalogError::Remote {
            status: Some(404), ..
        } => StatusCode::NOT_FOUND,
        CatalogError::Remote { .. } | CatalogError::EmptyResponse(_) => StatusCode::BAD_GATEWAY,
        CatalogError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        CatalogError::InvalidId(_) => StatusCode::NOT_FOUND,
        CatalogError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
