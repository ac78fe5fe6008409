//! View models and the listing controller.
//!
//! A `Listing` is what a mounted listing view owns: the pages fetched so far,
//! whether a request is in flight, and the last failure. Page structs below
//! are the serialized shapes handed to clients.
use crate::error::CatalogError;
use crate::models::{Movie, MovieDetails, PagedResult};
use crate::routes::Route;
use crate::store::LibraryStore;
use crate::tmdb::{ImageUrls, TmdbApi};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingSource {
    Popular,
    Search(String),
}

impl ListingSource {
    /// Route of the first page; other pages go through `Route::with_page`.
    pub fn route(&self) -> Route {
        match self {
            ListingSource::Popular => Route::Home { page: 1 },
            ListingSource::Search(query) => Route::Search {
                query: query.clone(),
                page: 1,
            },
        }
    }

    pub fn heading(&self) -> String {
        match self {
            ListingSource::Popular => "Popular movies".to_string(),
            ListingSource::Search(query) => format!("Results for \"{query}\""),
        }
    }

    async fn fetch(
        &self,
        api: &dyn TmdbApi,
        page: u32,
    ) -> Result<PagedResult<Movie>, CatalogError> {
        match self {
            ListingSource::Popular => api.popular_movies(page).await,
            ListingSource::Search(query) => api.search_movies(query, page).await,
        }
    }
}

#[derive(Debug)]
pub enum ListingState {
    Idle,
    Loading,
    Failed(CatalogError),
    Ready,
}

/// Identifies one outstanding request. Only the most recent ticket may
/// complete a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    page: u32,
    fresh: bool,
}

#[derive(Debug)]
pub struct Listing {
    source: ListingSource,
    pages: Vec<PagedResult<Movie>>,
    state: ListingState,
    generation: u64,
    in_flight: Option<Ticket>,
    failed: Option<Ticket>,
    mounted: bool,
}

impl Listing {
    pub fn new(source: ListingSource) -> Self {
        Self {
            source,
            pages: Vec::new(),
            state: ListingState::Idle,
            generation: 0,
            in_flight: None,
            failed: None,
            mounted: true,
        }
    }

    pub fn source(&self) -> &ListingSource {
        &self.source
    }

    pub fn pages(&self) -> &[PagedResult<Movie>] {
        &self.pages
    }

    pub fn movies(&self) -> impl Iterator<Item = &Movie> {
        self.pages.iter().flat_map(|p| p.results.iter())
    }

    pub fn last_page(&self) -> Option<&PagedResult<Movie>> {
        self.pages.last()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn error(&self) -> Option<&CatalogError> {
        match &self.state {
            ListingState::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Page the retry affordance would request, if the last request failed.
    pub fn failed_page(&self) -> Option<u32> {
        self.failed.map(|t| t.page)
    }

    pub fn has_more(&self) -> bool {
        self.pages.last().map(|p| p.has_more()).unwrap_or(false)
    }

    pub fn next_page(&self) -> Option<u32> {
        if self.has_more() {
            self.pages.last().map(|p| p.page + 1)
        } else {
            None
        }
    }

    /// The view went away; anything still in flight is dropped on arrival.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.in_flight = None;
    }

    /// Starts a request for `page`. A fresh load (`fresh = true`) replaces the
    /// current pages and supersedes anything in flight; an append is refused
    /// while another request is outstanding.
    pub fn begin(&mut self, page: u32, fresh: bool) -> Option<Ticket> {
        if !self.mounted || (!fresh && self.in_flight.is_some()) {
            return None;
        }
        self.generation += 1;
        let ticket = Ticket {
            generation: self.generation,
            page: page.max(1),
            fresh,
        };
        self.in_flight = Some(ticket);
        self.state = ListingState::Loading;
        Some(ticket)
    }

    /// Applies a response. Returns `false` when it was ignored because the
    /// view unmounted or a newer request superseded it.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<PagedResult<Movie>, CatalogError>,
    ) -> bool {
        if !self.mounted || self.in_flight != Some(ticket) {
            debug!(page = ticket.page, "Dropping stale listing response");
            return false;
        }
        self.in_flight = None;
        match result {
            Ok(page) => {
                self.failed = None;
                self.accept_page(ticket, page);
                self.state = ListingState::Ready;
            }
            Err(e) => {
                warn!(page = ticket.page, "Listing request failed: {}", e);
                self.failed = Some(ticket);
                self.state = ListingState::Failed(e);
            }
        }
        true
    }

    fn accept_page(&mut self, ticket: Ticket, page: PagedResult<Movie>) {
        if ticket.fresh {
            self.pages = vec![page];
            return;
        }
        let expected = self.pages.last().map(|p| p.page + 1).unwrap_or(1);
        if page.page == expected {
            self.pages.push(page);
        } else {
            warn!(expected, got = page.page, "Dropping out-of-sequence page");
        }
    }

    pub async fn load_first(&mut self, api: &dyn TmdbApi) {
        self.load_at(api, 1).await;
    }

    /// Fresh load starting at an arbitrary page (deep links like `/?page=3`).
    pub async fn load_at(&mut self, api: &dyn TmdbApi, page: u32) {
        if let Some(ticket) = self.begin(page, true) {
            self.run(api, ticket).await;
        }
    }

    /// Appends the next page. No-op while loading or when on the last page.
    pub async fn load_more(&mut self, api: &dyn TmdbApi) -> bool {
        let Some(next) = self.next_page() else {
            return false;
        };
        match self.begin(next, false) {
            Some(ticket) => {
                self.run(api, ticket).await;
                true
            }
            None => false,
        }
    }

    /// Re-issues the request that failed last, once.
    pub async fn retry(&mut self, api: &dyn TmdbApi) -> bool {
        let Some(failed) = self.failed else {
            return false;
        };
        match self.begin(failed.page, failed.fresh) {
            Some(ticket) => {
                self.run(api, ticket).await;
                true
            }
            None => false,
        }
    }

    async fn run(&mut self, api: &dyn TmdbApi, ticket: Ticket) {
        let result = self.source.fetch(api, ticket.page).await;
        self.complete(ticket, result);
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovieCard {
    pub id: u64,
    pub title: String,
    pub year: Option<String>,
    pub rating: f32,
    pub poster_url: String,
    pub is_favorite: bool,
    pub href: String,
}

impl MovieCard {
    pub fn new(movie: &Movie, is_favorite: bool, images: &ImageUrls) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            year: release_year(movie.release_date.as_deref()),
            rating: round_rating(movie.vote_average),
            poster_url: images.poster_url(movie.poster_path.as_deref()),
            is_favorite,
            href: Route::Movie { id: movie.id }.href(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPanel {
    pub message: String,
    pub detail: String,
    pub retry: Option<String>,
}

impl ErrorPanel {
    pub fn new(error: &CatalogError, retry: Option<Route>) -> Self {
        Self {
            message: error.user_message().to_string(),
            detail: error.to_string(),
            retry: retry
                .filter(|_| error.is_retryable())
                .map(|r| r.href()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingPage {
    pub heading: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub cards: Vec<MovieCard>,
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u32,
    pub load_more: Option<String>,
    pub error: Option<ErrorPanel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recent_searches: Vec<String>,
}

impl ListingPage {
    pub fn render(listing: &Listing, store: &LibraryStore, images: &ImageUrls) -> Self {
        let source = listing.source();
        let cards = listing
            .movies()
            .map(|m| MovieCard::new(m, store.is_favorite(m.id), images))
            .collect();
        let (page, total_pages, total_results) = listing
            .last_page()
            .map(|p| (p.page, p.total_pages, p.total_results))
            .unwrap_or((0, 0, 0));
        let load_more = listing
            .next_page()
            .filter(|_| !listing.is_loading())
            .map(|n| source.route().with_page(n).href());
        let error = listing.error().map(|e| {
            let retry = listing.failed_page().map(|p| source.route().with_page(p));
            ErrorPanel::new(e, retry)
        });
        let (query, recent_searches) = match source {
            ListingSource::Search(q) => (Some(q.clone()), store.search_history().to_vec()),
            ListingSource::Popular => (None, Vec::new()),
        };

        Self {
            heading: source.heading(),
            query,
            cards,
            page,
            total_pages,
            total_results,
            load_more,
            error,
            recent_searches,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailPanel {
    #[serde(flatten)]
    pub card: MovieCard,
    pub overview: String,
    pub tagline: Option<String>,
    pub runtime: Option<String>,
    pub status: Option<String>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    pub vote_count: u32,
    pub genres: Vec<String>,
    pub production_companies: Vec<String>,
    pub backdrop_url: String,
}

impl DetailPanel {
    pub fn new(details: &MovieDetails, is_favorite: bool, images: &ImageUrls) -> Self {
        let movie = &details.movie;
        Self {
            card: MovieCard::new(movie, is_favorite, images),
            overview: movie.overview.clone(),
            tagline: details.tagline.clone().filter(|t| !t.trim().is_empty()),
            runtime: details.runtime.and_then(format_runtime),
            status: details.status.clone(),
            budget: Some(details.budget).filter(|b| *b > 0),
            revenue: Some(details.revenue).filter(|r| *r > 0),
            vote_count: movie.vote_count,
            genres: details.genres.iter().map(|g| g.name.clone()).collect(),
            production_companies: details
                .production_companies
                .iter()
                .map(|c| c.name.clone())
                .collect(),
            backdrop_url: images.backdrop_url(movie.backdrop_path.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoritesPage {
    pub heading: String,
    pub count: usize,
    pub cards: Vec<MovieCard>,
}

impl FavoritesPage {
    pub fn render(store: &LibraryStore, images: &ImageUrls) -> Self {
        Self {
            heading: "Your favorites".to_string(),
            count: store.favorite_count(),
            cards: store
                .favorites()
                .iter()
                .map(|m| MovieCard::new(m, true, images))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub query: String,
    pub href: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub limit: usize,
    pub entries: Vec<HistoryEntry>,
}

impl HistoryPage {
    pub fn render(store: &LibraryStore) -> Self {
        Self {
            limit: store.history_limit(),
            entries: store
                .search_history()
                .iter()
                .map(|q| HistoryEntry {
                    query: q.clone(),
                    href: ListingSource::Search(q.clone()).route().href(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotFoundPage {
    pub message: String,
    pub path: String,
    pub home: String,
}

impl NotFoundPage {
    pub fn new(path: &str) -> Self {
        Self {
            message: "Nothing here. The page you asked for does not exist.".to_string(),
            path: path.to_string(),
            home: Route::Home { page: 1 }.href(),
        }
    }
}

pub const DETAIL_CACHE_CAPACITY: usize = 256;

/// Movie details fetched during this process's lifetime. Never persisted.
/// Holds at most `capacity` movies; the oldest insert is evicted first.
#[derive(Debug)]
pub struct DetailCache {
    capacity: usize,
    entries: RwLock<CacheEntries>,
}

#[derive(Debug, Default)]
struct CacheEntries {
    by_id: HashMap<u64, MovieDetails>,
    order: VecDeque<u64>,
}

impl Default for DetailCache {
    fn default() -> Self {
        Self::with_capacity(DETAIL_CACHE_CAPACITY)
    }
}

impl DetailCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(CacheEntries::default()),
        }
    }

    pub fn get(&self, id: u64) -> Option<MovieDetails> {
        self.entries.read().ok()?.by_id.get(&id).cloned()
    }

    pub fn insert(&self, details: MovieDetails) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        let id = details.movie.id;
        if entries.by_id.insert(id, details).is_some() {
            return;
        }
        entries.order.push_back(id);
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.by_id.remove(&oldest);
                debug!(id = oldest, "Evicted movie details from cache");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.by_id.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn release_year(date: Option<&str>) -> Option<String> {
    let year = date?.get(..4)?;
    year.chars()
        .all(|c| c.is_ascii_digit())
        .then(|| year.to_string())
}

fn round_rating(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

pub fn format_runtime(minutes: u32) -> Option<String> {
    match (minutes / 60, minutes % 60) {
        (0, 0) => None,
        (0, m) => Some(format!("{m}m")),
        (h, 0) => Some(format!("{h}h")),
        (h, m) => Some(format!("{h}h {m}m")),
    }
}
