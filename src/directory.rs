use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use serde::{Deserialize, Serialize};

/// Region label the provider uses for aggregate pseudo-countries.
pub const AGGREGATES_REGION: &str = "Aggregates";

pub fn is_aggregate(region: &str) -> bool {
    region.trim() == AGGREGATES_REGION
}

// ---------------------------------------------------------------------------
// CountryInfo / CountryDirectory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryInfo {
    pub code: String,
    pub name: String,
    pub region: String,
}

/// Immutable code → country lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryDirectory {
    entries: BTreeMap<String, CountryInfo>,
}

impl CountryDirectory {
    pub fn new(countries: impl IntoIterator<Item = CountryInfo>) -> Self {
        let entries = countries
            .into_iter()
            .filter(|c| !is_aggregate(&c.region))
            .map(|c| (c.code.clone(), c))
            .collect();
        CountryDirectory { entries }
    }

    pub fn get(&self, code: &str) -> Option<&CountryInfo> {
        self.entries.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// Country name, falling back to the code for unknown entries.
    pub fn name<'a>(&'a self, code: &'a str) -> &'a str {
        self.get(code).map(|c| c.name.as_str()).unwrap_or(code)
    }

    /// `"Name (CODE)"`, the label used in selectors and in the dataset.
    pub fn display_name(&self, code: &str) -> String {
        match self.get(code) {
            Some(c) => format!("{} ({})", c.name, c.code),
            None => code.to_string(),
        }
    }

    /// Entries ordered by display name.
    pub fn sorted_by_name(&self) -> Vec<&CountryInfo> {
        let mut all: Vec<&CountryInfo> = self.entries.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
        all
    }

    pub fn regions(&self) -> BTreeSet<&str> {
        self.entries
            .values()
            .map(|c| c.region.as_str())
            .filter(|r| !r.is_empty())
            .collect()
    }

    /// All codes of one region, for bulk selection.
    pub fn codes_in_region(&self, region: &str) -> Vec<String> {
        self.entries
            .values()
            .filter(|c| c.region == region)
            .map(|c| c.code.clone())
            .collect()
    }

    /// Case-insensitive substring match on code or name.
    pub fn search(&self, query: &str) -> Vec<&CountryInfo> {
        let q = query.trim().to_lowercase();
        self.sorted_by_name()
            .into_iter()
            .filter(|c| {
                q.is_empty() || c.name.to_lowercase().contains(&q) || c.code.to_lowercase().contains(&q)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// DirectoryCache – shared, rarely refreshed
// ---------------------------------------------------------------------------

/// Read-many / write-rarely holder of the current directory snapshot.
///
/// Readers clone an `Arc` and never observe a half-built directory. Loading
/// happens outside the read lock and refreshes are serialized by a separate
/// mutex, so readers keep seeing the previous snapshot while a refresh runs.
#[derive(Debug, Default)]
pub struct DirectoryCache {
    current: RwLock<Option<Arc<CountryDirectory>>>,
    refresh: Mutex<()>,
}

static GLOBAL: OnceLock<DirectoryCache> = OnceLock::new();

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance.
    pub fn global() -> &'static DirectoryCache {
        GLOBAL.get_or_init(DirectoryCache::new)
    }

    /// Current snapshot, if one was ever loaded.
    pub fn snapshot(&self) -> Option<Arc<CountryDirectory>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Return the cached directory, loading it on first use.
    pub fn get_or_init<F, E>(&self, load: F) -> Result<Arc<CountryDirectory>, E>
    where
        F: FnOnce() -> Result<Vec<CountryInfo>, E>,
    {
        if let Some(dir) = self.snapshot() {
            return Ok(dir);
        }
        let _guard = self.refresh.lock().unwrap_or_else(|e| e.into_inner());
        // Another caller may have finished loading while we waited.
        if let Some(dir) = self.snapshot() {
            return Ok(dir);
        }
        self.install(load()?)
    }

    /// Reload unconditionally. Concurrent refreshes run one after another;
    /// on error the previous snapshot stays in place.
    pub fn refresh<F, E>(&self, load: F) -> Result<Arc<CountryDirectory>, E>
    where
        F: FnOnce() -> Result<Vec<CountryInfo>, E>,
    {
        let _guard = self.refresh.lock().unwrap_or_else(|e| e.into_inner());
        self.install(load()?)
    }

    fn install<E>(&self, countries: Vec<CountryInfo>) -> Result<Arc<CountryDirectory>, E> {
        let dir = Arc::new(CountryDirectory::new(countries));
        log::info!("country directory holds {} entries", dir.len());
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&dir));
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    fn info(code: &str, name: &str, region: &str) -> CountryInfo {
        CountryInfo {
            code: code.into(),
            name: name.into(),
            region: region.into(),
        }
    }

    fn sample() -> Vec<CountryInfo> {
        vec![
            info("USA", "United States", "North America"),
            info("CAN", "Canada", "North America"),
            info("NGA", "Nigeria", "Sub-Saharan Africa"),
            info("WLD", "World", "Aggregates"),
        ]
    }

    #[test]
    fn lookup_and_display() {
        let dir = CountryDirectory::new(sample());
        assert_eq!(dir.len(), 3);
        assert!(!dir.contains("WLD"));
        assert_eq!(dir.display_name("USA"), "United States (USA)");
        assert_eq!(dir.display_name("XXX"), "XXX");
        assert_eq!(dir.name("NGA"), "Nigeria");
    }

    #[test]
    fn region_selection() {
        let dir = CountryDirectory::new(sample());
        assert_eq!(
            dir.regions().into_iter().collect::<Vec<_>>(),
            vec!["North America", "Sub-Saharan Africa"]
        );
        assert_eq!(dir.codes_in_region("North America"), vec!["CAN", "USA"]);
        assert!(dir.codes_in_region("Aggregates").is_empty());
    }

    #[test]
    fn search_matches_name_or_code() {
        let dir = CountryDirectory::new(sample());
        let hits: Vec<&str> = dir.search("an").iter().map(|c| c.code.as_str()).collect();
        assert_eq!(hits, vec!["CAN"]);
        assert_eq!(dir.search("nga")[0].code, "NGA");
        assert_eq!(dir.search("").len(), 3);
    }

    #[test]
    fn cache_loads_once() {
        let cache = DirectoryCache::new();
        let calls = AtomicUsize::new(0);
        let load = || -> Result<_, ()> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample())
        };

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| cache.get_or_init(load).unwrap());
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.snapshot().unwrap().len(), 3);
    }

    #[test]
    fn failed_refresh_keeps_previous_snapshot() {
        let cache = DirectoryCache::new();
        assert!(cache.snapshot().is_none());
        let first = cache.get_or_init(|| Ok::<_, ()>(sample())).unwrap();

        assert!(cache.refresh(|| Err::<Vec<CountryInfo>, _>("offline")).is_err());
        assert!(Arc::ptr_eq(&first, &cache.snapshot().unwrap()));

        let second = cache
            .refresh(|| Ok::<_, ()>(vec![info("FRA", "France", "Europe & Central Asia")]))
            .unwrap();
        assert_eq!(second.len(), 1);
        // earlier readers still hold their own snapshot
        assert_eq!(first.len(), 3);
    }
}
