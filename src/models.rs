use serde::{Deserialize, Serialize};

/// Movie summary as returned by listing and search endpoints.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f32,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProductionCompany {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
    #[serde(default)]
    pub origin_country: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MovieDetails {
    #[serde(flatten)]
    pub movie: Movie,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub budget: u64,
    #[serde(default)]
    pub revenue: u64,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub production_companies: Vec<ProductionCompany>,
}

impl MovieDetails {
    /// Summary suitable for the favorites list. The details endpoint sends full
    /// genre objects instead of `genre_ids`, so the ids are rebuilt from those.
    pub fn summary(&self) -> Movie {
        let mut movie = self.movie.clone();
        if movie.genre_ids.is_empty() {
            movie.genre_ids = self.genres.iter().map(|g| g.id).collect();
        }
        movie
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PagedResult<T> {
    pub page: u32,
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

impl<T> PagedResult<T> {
    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Shape checks applied to catalog payloads before they reach a view.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

impl Validate for Movie {
    fn validate(&self) -> Result<(), String> {
        if self.id == 0 {
            return Err("movie without an id".to_string());
        }
        if self.title.trim().is_empty() {
            return Err(format!("movie {} has no title", self.id));
        }
        Ok(())
    }
}

impl Validate for MovieDetails {
    fn validate(&self) -> Result<(), String> {
        self.movie.validate()
    }
}

impl<T: Validate> Validate for PagedResult<T> {
    fn validate(&self) -> Result<(), String> {
        if self.page == 0 {
            return Err("page numbers start at 1".to_string());
        }
        self.results.iter().try_for_each(Validate::validate)
    }
}
