//! Persistence of aggregated timelines.
//!
//! Only raw aggregated timelines are stored. Keys are plain structs so the
//! storage layer never has to parse parameters back out of file names.

mod disk;

pub use disk::DiskTimelineCache;

use serde::{
    Deserialize,
    Serialize,
};
use std::sync::Mutex;

use crate::errors::Result;
use crate::models::{
    Timeline,
    TimelineMap,
};

/// Identifies the timeline of one m/z value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleTimelineKey {
    pub file_stem: String,
    pub bin_width: f64,
    pub function: u32,
    pub mz: f64,
}

/// Identifies a full-spectrum aggregation over `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeTimelineKey {
    pub file_stem: String,
    pub bin_width: f64,
    pub function: u32,
    pub start: f64,
    pub end: f64,
}

impl RangeTimelineKey {
    /// True when a stored entry under `self` can answer a request for `requested`.
    pub fn covers(&self, requested: &RangeTimelineKey) -> bool {
        self.file_stem == requested.file_stem
            && self.bin_width == requested.bin_width
            && self.function == requested.function
            && self.start <= requested.start
            && requested.end <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedTimeline {
    pub timeline: Timeline,
    pub creation_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedTimelines {
    pub timelines: TimelineMap,
    pub creation_date: Option<String>,
}

/// Storage for timelines. Implementations own their own eviction policy.
pub trait TimelineCache: Sync {
    fn load(&self, key: &SingleTimelineKey) -> Result<Option<CachedTimeline>>;

    /// Returns an entry whose stored range covers the requested one.
    fn load_range(&self, key: &RangeTimelineKey) -> Result<Option<CachedTimelines>>;

    fn save(&self, key: &SingleTimelineKey, timeline: &[f64], creation_date: Option<&str>) -> Result<()>;

    fn save_range(
        &self,
        key: &RangeTimelineKey,
        timelines: &TimelineMap,
        creation_date: Option<&str>,
    ) -> Result<()>;
}

/// Cache that stores nothing, used when caching is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl TimelineCache for NoCache {
    fn load(&self, _key: &SingleTimelineKey) -> Result<Option<CachedTimeline>> {
        Ok(None)
    }

    fn load_range(&self, _key: &RangeTimelineKey) -> Result<Option<CachedTimelines>> {
        Ok(None)
    }

    fn save(&self, _key: &SingleTimelineKey, _timeline: &[f64], _creation_date: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn save_range(
        &self,
        _key: &RangeTimelineKey,
        _timelines: &TimelineMap,
        _creation_date: Option<&str>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Process-local cache without eviction.
#[derive(Debug, Default)]
pub struct MemoryTimelineCache {
    singles: Mutex<Vec<(SingleTimelineKey, CachedTimeline)>>,
    ranges: Mutex<Vec<(RangeTimelineKey, CachedTimelines)>>,
}

impl MemoryTimelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        let singles = self.singles.lock().map(|x| x.len()).unwrap_or(0);
        let ranges = self.ranges.lock().map(|x| x.len()).unwrap_or(0);
        singles + ranges
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl TimelineCache for MemoryTimelineCache {
    fn load(&self, key: &SingleTimelineKey) -> Result<Option<CachedTimeline>> {
        Ok(lock(&self.singles)
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone()))
    }

    fn load_range(&self, key: &RangeTimelineKey) -> Result<Option<CachedTimelines>> {
        Ok(lock(&self.ranges)
            .iter()
            .find(|(k, _)| k.covers(key))
            .map(|(_, v)| v.clone()))
    }

    fn save(&self, key: &SingleTimelineKey, timeline: &[f64], creation_date: Option<&str>) -> Result<()> {
        let mut singles = lock(&self.singles);
        singles.retain(|(k, _)| k != key);
        singles.push((
            key.clone(),
            CachedTimeline {
                timeline: timeline.to_vec(),
                creation_date: creation_date.map(str::to_string),
            },
        ));
        Ok(())
    }

    fn save_range(
        &self,
        key: &RangeTimelineKey,
        timelines: &TimelineMap,
        creation_date: Option<&str>,
    ) -> Result<()> {
        let mut ranges = lock(&self.ranges);
        ranges.retain(|(k, _)| k != key);
        ranges.push((
            key.clone(),
            CachedTimelines {
                timelines: timelines.clone(),
                creation_date: creation_date.map(str::to_string),
            },
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range_key(start: f64, end: f64) -> RangeTimelineKey {
        RangeTimelineKey {
            file_stem: "sample".to_string(),
            bin_width: 0.04,
            function: 2,
            start,
            end,
        }
    }

    #[test]
    fn test_range_cover_is_superset_match() {
        let stored = range_key(50.0, 8000.0);
        assert!(stored.covers(&range_key(50.0, 8000.0)));
        assert!(stored.covers(&range_key(100.0, 200.0)));
        assert!(!stored.covers(&range_key(40.0, 200.0)));
        assert!(!stored.covers(&range_key(100.0, 8000.5)));

        let mut other_function = range_key(100.0, 200.0);
        other_function.function = 1;
        assert!(!stored.covers(&other_function));
    }

    #[test]
    fn test_memory_cache_roundtrip() {
        let cache = MemoryTimelineCache::new();
        let key = SingleTimelineKey {
            file_stem: "sample".to_string(),
            bin_width: 0.04,
            function: 2,
            mz: 301.14,
        };
        assert!(cache.load(&key).unwrap().is_none());
        cache.save(&key, &[1.0, 2.0], Some("today")).unwrap();
        cache.save(&key, &[3.0, 4.0], Some("today")).unwrap();
        let hit = cache.load(&key).unwrap().unwrap();
        assert_eq!(hit.timeline, vec![3.0, 4.0]);
        assert_eq!(hit.creation_date.as_deref(), Some("today"));
        assert_eq!(cache.len(), 1);
    }
}
