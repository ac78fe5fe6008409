use crate::config::HISTORY_LIMIT;
use crate::models::Movie;
use crate::storage::Storage;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub const FAVORITES_KEY: &str = "cineshelf.favorites";
pub const HISTORY_KEY: &str = "cineshelf.search_history";

/// Serialized form of the store, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub favorites: String,
    pub history: String,
}

/// Favorites and recent searches, mirrored to `Storage` after every change.
///
/// All operations are synchronous and infallible for the caller. Storage
/// failures are logged and the in-memory state stays authoritative for the
/// rest of the session.
pub struct LibraryStore {
    favorites: Vec<Movie>,
    favorite_ids: HashSet<u64>,
    history: Vec<String>,
    history_limit: usize,
    storage: Arc<dyn Storage>,
}

impl std::fmt::Debug for LibraryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryStore")
            .field("favorites", &self.favorites.len())
            .field("history", &self.history)
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

impl LibraryStore {
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        Self::load_with_limit(storage, HISTORY_LIMIT)
    }

    pub fn load_with_limit(storage: Arc<dyn Storage>, history_limit: usize) -> Self {
        let stored_favorites: Vec<Movie> = read_json(storage.as_ref(), FAVORITES_KEY);
        let stored_history: Vec<String> = read_json(storage.as_ref(), HISTORY_KEY);

        let mut store = Self {
            favorites: Vec::with_capacity(stored_favorites.len()),
            favorite_ids: HashSet::with_capacity(stored_favorites.len()),
            history: Vec::new(),
            history_limit,
            storage,
        };
        for movie in stored_favorites {
            if store.favorite_ids.insert(movie.id) {
                store.favorites.push(movie);
            }
        }
        for query in stored_history {
            let query = query.trim();
            if !query.is_empty() && !store.history.iter().any(|q| q == query) {
                store.history.push(query.to_string());
            }
        }
        store.history.truncate(history_limit);

        debug!(
            favorites = store.favorites.len(),
            history = store.history.len(),
            "Loaded library store"
        );
        store
    }

    pub fn favorites(&self) -> &[Movie] {
        &self.favorites
    }

    pub fn favorite_count(&self) -> usize {
        self.favorites.len()
    }

    pub fn search_history(&self) -> &[String] {
        &self.history
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn is_favorite(&self, id: u64) -> bool {
        self.favorite_ids.contains(&id)
    }

    /// Adding a movie that is already a favorite leaves the list untouched but
    /// still writes it out.
    pub fn add_to_favorites(&mut self, movie: Movie) {
        if self.favorite_ids.insert(movie.id) {
            self.favorites.push(movie);
        }
        self.persist();
    }

    pub fn remove_from_favorites(&mut self, id: u64) {
        if self.favorite_ids.remove(&id) {
            self.favorites.retain(|m| m.id != id);
        }
        self.persist();
    }

    pub fn clear_favorites(&mut self) {
        self.favorites.clear();
        self.favorite_ids.clear();
        self.persist();
    }

    /// Moves `query` to the front, dropping any earlier occurrence and the
    /// oldest entries past the limit. Blank queries are ignored.
    pub fn add_to_search_history(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        self.history.retain(|q| q != query);
        self.history.insert(0, query.to_string());
        self.history.truncate(self.history_limit);
        self.persist();
    }

    pub fn clear_search_history(&mut self) {
        self.history.clear();
        self.persist();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            favorites: to_json(&self.favorites),
            history: to_json(&self.history),
        }
    }

    pub fn persist(&self) {
        write_snapshot(self.storage.as_ref(), &self.snapshot());
    }
}

/// Writes both entries. Failures are logged and swallowed.
pub fn write_snapshot(storage: &dyn Storage, snapshot: &Snapshot) {
    for (key, value) in [
        (FAVORITES_KEY, &snapshot.favorites),
        (HISTORY_KEY, &snapshot.history),
    ] {
        if let Err(e) = storage.write(key, value) {
            warn!("Failed to persist '{}': {:#}", key, e);
        }
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        warn!("Failed to serialize store state: {}", e);
        "[]".to_string()
    })
}

fn read_json<T>(storage: &dyn Storage, key: &str) -> Vec<T>
where
    T: serde::de::DeserializeOwned,
{
    match storage.read(key) {
        Ok(Some(text)) => match serde_json::from_str(&text) {
            Ok(items) => items,
            Err(e) => {
                warn!("Ignoring corrupt '{}' in storage: {}", key, e);
                Vec::new()
            }
        },
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("Failed to read '{}' from storage, starting empty: {:#}", key, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};

    fn movie(id: u64, title: &str) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            overview: String::new(),
            poster_path: Some(format!("/{id}.jpg")),
            backdrop_path: None,
            release_date: Some("2001-01-01".to_string()),
            vote_average: 7.5,
            vote_count: 10,
            genre_ids: vec![18],
        }
    }

    fn fresh() -> (Arc<MemoryStorage>, LibraryStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = LibraryStore::load(storage.clone());
        (storage, store)
    }

    #[test]
    fn add_then_remove_toggles_membership() {
        let (_, mut store) = fresh();
        store.add_to_favorites(movie(550, "Fight Club"));
        assert!(store.is_favorite(550));
        store.remove_from_favorites(550);
        assert!(!store.is_favorite(550));
        assert!(store.favorites().is_empty());
    }

    #[test]
    fn adding_twice_keeps_one_entry() {
        let (storage, mut store) = fresh();
        store.add_to_favorites(movie(550, "Fight Club"));
        store.add_to_favorites(movie(550, "Fight Club"));
        assert_eq!(store.favorite_count(), 1);

        let written = storage.read(FAVORITES_KEY).unwrap().unwrap();
        let stored: Vec<Movie> = serde_json::from_str(&written).unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn adding_existing_favorite_still_writes_through() {
        let (storage, mut store) = fresh();
        store.add_to_favorites(movie(550, "Fight Club"));
        storage.write(FAVORITES_KEY, "[]").unwrap();

        store.add_to_favorites(movie(550, "Fight Club"));
        let written = storage.read(FAVORITES_KEY).unwrap().unwrap();
        let stored: Vec<Movie> = serde_json::from_str(&written).unwrap();
        let ids: Vec<u64> = stored.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![550]);
    }

    #[test]
    fn removing_absent_id_is_a_no_op() {
        let (_, mut store) = fresh();
        store.add_to_favorites(movie(1, "One"));
        store.remove_from_favorites(99);
        assert_eq!(store.favorite_count(), 1);
    }

    #[test]
    fn favorites_keep_insertion_order() {
        let (_, mut store) = fresh();
        store.add_to_favorites(movie(3, "C"));
        store.add_to_favorites(movie(1, "A"));
        store.add_to_favorites(movie(2, "B"));
        let ids: Vec<u64> = store.favorites().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn clear_favorites_persists_empty_list() {
        let (storage, mut store) = fresh();
        store.add_to_favorites(movie(1, "One"));
        store.clear_favorites();
        assert!(!store.is_favorite(1));
        assert_eq!(storage.read(FAVORITES_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn history_moves_repeats_to_front() {
        let (_, mut store) = fresh();
        store.add_to_search_history("batman");
        store.add_to_search_history("robin");
        store.add_to_search_history("batman");
        assert_eq!(store.search_history(), ["batman", "robin"]);
    }

    #[test]
    fn history_never_exceeds_limit() {
        let (_, mut store) = fresh();
        for i in 0..25 {
            store.add_to_search_history(&format!("query {i}"));
            assert!(store.search_history().len() <= HISTORY_LIMIT);
        }
        assert_eq!(store.search_history().len(), HISTORY_LIMIT);
        assert_eq!(store.search_history()[0], "query 24");
        assert_eq!(store.search_history()[HISTORY_LIMIT - 1], "query 15");
    }

    #[test]
    fn blank_queries_are_not_recorded() {
        let (_, mut store) = fresh();
        store.add_to_search_history("   ");
        store.add_to_search_history(" dune ");
        assert_eq!(store.search_history(), ["dune"]);
    }

    #[test]
    fn clear_history_persists() {
        let (storage, mut store) = fresh();
        store.add_to_search_history("alien");
        store.clear_search_history();
        assert!(store.search_history().is_empty());
        assert_eq!(storage.read(HISTORY_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn reload_restores_favorites_and_history() {
        let (storage, mut store) = fresh();
        store.add_to_favorites(movie(10, "Ten"));
        store.add_to_favorites(movie(20, "Twenty"));
        store.add_to_search_history("heat");
        let before = store.favorites().to_vec();

        let reloaded = LibraryStore::load(storage);
        assert_eq!(reloaded.favorites(), before.as_slice());
        assert!(reloaded.is_favorite(10));
        assert!(reloaded.is_favorite(20));
        assert_eq!(reloaded.search_history(), ["heat"]);
    }

    #[test]
    fn reload_from_files_matches() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(dir.path()));
        let mut store = LibraryStore::load(storage.clone());
        store.add_to_favorites(movie(603, "The Matrix"));
        store.add_to_search_history("matrix");

        let reloaded = LibraryStore::load(storage);
        assert_eq!(reloaded.favorites(), store.favorites());
        assert_eq!(reloaded.search_history(), store.search_history());
    }

    #[test]
    fn corrupt_storage_loads_as_empty() {
        let storage = Arc::new(
            MemoryStorage::new()
                .with_entry(FAVORITES_KEY, "{not json")
                .with_entry(HISTORY_KEY, "42"),
        );
        let store = LibraryStore::load(storage);
        assert!(store.favorites().is_empty());
        assert!(store.search_history().is_empty());
    }

    #[test]
    fn stored_duplicates_and_overflow_are_cleaned_on_load() {
        let favorites =
            serde_json::to_string(&vec![movie(1, "One"), movie(1, "One again")]).unwrap();
        let history = serde_json::to_string(&vec!["a", "b", "a", "c", "d"]).unwrap();
        let storage = Arc::new(
            MemoryStorage::new()
                .with_entry(FAVORITES_KEY, &favorites)
                .with_entry(HISTORY_KEY, &history),
        );
        let store = LibraryStore::load_with_limit(storage, 2);
        assert_eq!(store.favorite_count(), 1);
        assert_eq!(store.favorites()[0].title, "One");
        assert_eq!(store.search_history(), ["a", "b"]);
    }

    #[test]
    fn failing_storage_keeps_in_memory_state() {
        let mut store = LibraryStore::load(Arc::new(MemoryStorage::failing()));
        store.add_to_favorites(movie(5, "Five"));
        store.add_to_search_history("five");
        assert!(store.is_favorite(5));
        assert_eq!(store.search_history(), ["five"]);
    }

    #[test]
    fn snapshot_serializes_current_state() {
        let (_, mut store) = fresh();
        store.add_to_search_history("up");
        let snapshot = store.snapshot();
        assert_eq!(snapshot.favorites, "[]");
        assert_eq!(snapshot.history, r#"["up"]"#);
    }
}
