/// Logical locations in the app. Views link to each other through `href()`
/// instead of formatting paths by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home { page: u32 },
    Search { query: String, page: u32 },
    Movie { id: u64 },
    Favorites,
    NotFound,
}

impl Route {
    pub fn href(&self) -> String {
        match self {
            Route::Home { page } if *page <= 1 => "/".to_string(),
            Route::Home { page } => format!("/?page={page}"),
            Route::Search { query, page } => {
                let q = urlencoding::encode(query);
                if *page <= 1 {
                    format!("/search?q={q}")
                } else {
                    format!("/search?q={q}&page={page}")
                }
            }
            Route::Movie { id } => format!("/movie/{id}"),
            Route::Favorites => "/favorites".to_string(),
            Route::NotFound => "/404".to_string(),
        }
    }

    /// Same route, another page. Non-paged routes are returned unchanged.
    pub fn with_page(&self, page: u32) -> Route {
        match self {
            Route::Home { .. } => Route::Home { page },
            Route::Search { query, .. } => Route::Search {
                query: query.clone(),
                page,
            },
            other => other.clone(),
        }
    }

    /// Matches a request path (without query string) against the known routes.
    pub fn parse(path: &str) -> Route {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Route::Home { page: 1 },
            "/search" => Route::Search {
                query: String::new(),
                page: 1,
            },
            "/favorites" => Route::Favorites,
            _ => match trimmed.strip_prefix("/movie/").map(str::parse::<u64>) {
                Some(Ok(id)) if id > 0 => Route::Movie { id },
                _ => Route::NotFound,
            },
        }
    }
}
