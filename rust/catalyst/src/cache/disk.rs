use serde::{
    Deserialize,
    Serialize,
    de::DeserializeOwned,
};
use std::fs::File;
use std::io::{
    BufReader,
    BufWriter,
    Write,
};
use std::path::{
    Path,
    PathBuf,
};
use std::sync::{
    Mutex,
    MutexGuard,
};
use tracing::{
    debug,
    info,
    warn,
};
use zstd::stream::read::Decoder;
use zstd::stream::write::Encoder;

use super::{
    CachedTimeline,
    CachedTimelines,
    RangeTimelineKey,
    SingleTimelineKey,
    TimelineCache,
};
use crate::errors::{
    CacheError,
    Result,
};
use crate::models::TimelineMap;

const MANIFEST_FILE: &str = "manifest.json";
const ENTRY_DIR: &str = "entries";
const ZSTD_LEVEL: i32 = 3;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
enum EntryKey {
    Single(SingleTimelineKey),
    Range(RangeTimelineKey),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestEntry {
    key: EntryKey,
    file_name: String,
    size_bytes: u64,
    /// Value of the manifest clock when the entry was last read or written.
    last_used: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    next_id: u64,
    clock: u64,
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size_bytes).sum()
    }
}

/// Timeline cache stored as zstd-compressed MessagePack files under one
/// directory, with a JSON manifest holding keys and usage order.
///
/// After every save the least recently used entries are removed until the
/// total payload size is at most `max_size_bytes`.
#[derive(Debug)]
pub struct DiskTimelineCache {
    root: PathBuf,
    max_size_bytes: u64,
    manifest: Mutex<Manifest>,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        source,
        path: path.to_path_buf(),
    }
}

fn encode_to<T: Serialize>(path: &Path, data: &T) -> std::result::Result<(), CacheError> {
    let file = File::create(path).map_err(io_err(path))?;
    let mut encoder = Encoder::new(BufWriter::new(file), ZSTD_LEVEL).map_err(io_err(path))?;
    rmp_serde::encode::write(&mut encoder, data)?;
    let mut writer = encoder.finish().map_err(io_err(path))?;
    writer.flush().map_err(io_err(path))?;
    Ok(())
}

fn remove_entry_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove cache file {:?}: {}", path, e);
        }
    }
}

impl DiskTimelineCache {
    pub fn open(root: impl Into<PathBuf>, max_size_bytes: u64) -> Result<Self> {
        let root = root.into();
        let entry_dir = root.join(ENTRY_DIR);
        std::fs::create_dir_all(&entry_dir).map_err(io_err(&entry_dir))?;

        let manifest_path = root.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            let file = File::open(&manifest_path).map_err(io_err(&manifest_path))?;
            match serde_json::from_reader(BufReader::new(file)) {
                Ok(m) => m,
                Err(e) => {
                    warn!(
                        "Discarding unreadable cache manifest at {:?}: {}",
                        manifest_path, e
                    );
                    Manifest::default()
                }
            }
        } else {
            Manifest::default()
        };
        debug!(
            "Opened timeline cache at {:?} with {} entries",
            root,
            manifest.entries.len()
        );

        Ok(Self {
            root,
            max_size_bytes,
            manifest: Mutex::new(manifest),
        })
    }

    /// Opens a cache capped at `max_size_gb` gigabytes (negative values count as 0).
    pub fn with_size_gb(root: impl Into<PathBuf>, max_size_gb: f64) -> Result<Self> {
        let max_size_bytes = (max_size_gb.max(0.0) * BYTES_PER_GB) as u64;
        Self::open(root, max_size_bytes)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the payload sizes of all entries.
    pub fn total_size(&self) -> u64 {
        self.lock().total_size()
    }

    /// Removes every entry.
    pub fn clear(&self) -> Result<()> {
        let mut manifest = self.lock();
        for entry in manifest.entries.drain(..) {
            remove_entry_file(&self.entry_path(&entry.file_name));
        }
        self.write_manifest(&manifest)?;
        info!("Cleared timeline cache at {:?}", self.root);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Manifest> {
        match self.manifest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn entry_path(&self, file_name: &str) -> PathBuf {
        self.root.join(ENTRY_DIR).join(file_name)
    }

    fn write_manifest(&self, manifest: &Manifest) -> Result<()> {
        let path = self.root.join(MANIFEST_FILE);
        let file = File::create(&path).map_err(io_err(&path))?;
        serde_json::to_writer(BufWriter::new(file), manifest).map_err(CacheError::from)?;
        Ok(())
    }

    /// Encodes into a temporary file renamed into place, so a failed write
    /// never leaves a partial payload behind.
    fn write_payload<T: Serialize>(&self, file_name: &str, data: &T) -> Result<u64> {
        let path = self.entry_path(file_name);
        let tmp_path = path.with_extension("tmp");
        let written = encode_to(&tmp_path, data)
            .and_then(|()| std::fs::rename(&tmp_path, &path).map_err(io_err(&path)));
        if let Err(e) = written {
            remove_entry_file(&tmp_path);
            return Err(e.into());
        }
        let size = std::fs::metadata(&path).map_err(io_err(&path))?.len();
        Ok(size)
    }

    fn read_payload<T: DeserializeOwned>(&self, file_name: &str) -> Result<T> {
        let path = self.entry_path(file_name);
        let file = File::open(&path).map_err(io_err(&path))?;
        let decoder = Decoder::new(file).map_err(io_err(&path))?;
        let data = rmp_serde::from_read(decoder).map_err(CacheError::from)?;
        Ok(data)
    }

    fn load_where<T, F>(&self, matches: F) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        F: Fn(&EntryKey) -> bool,
    {
        let mut manifest = self.lock();
        let Some(idx) = manifest.entries.iter().position(|e| matches(&e.key)) else {
            return Ok(None);
        };
        let data = match self.read_payload(&manifest.entries[idx].file_name) {
            Ok(data) => data,
            Err(e) => {
                let entry = manifest.entries.remove(idx);
                warn!("Dropping unreadable cache entry {}: {}", entry.file_name, e);
                remove_entry_file(&self.entry_path(&entry.file_name));
                self.write_manifest(&manifest)?;
                return Err(e);
            }
        };
        let now = manifest.tick();
        manifest.entries[idx].last_used = now;
        self.write_manifest(&manifest)?;
        Ok(Some(data))
    }

    fn store<T: Serialize>(&self, key: EntryKey, data: &T) -> Result<()> {
        let mut manifest = self.lock();
        let id = manifest.next_id;
        manifest.next_id += 1;
        let file_name = format!("{id:08}.mpk.zst");
        let size_bytes = self.write_payload(&file_name, data)?;

        if let Some(idx) = manifest.entries.iter().position(|e| e.key == key) {
            let old = manifest.entries.remove(idx);
            remove_entry_file(&self.entry_path(&old.file_name));
        }
        let last_used = manifest.tick();
        manifest.entries.push(ManifestEntry {
            key,
            file_name,
            size_bytes,
            last_used,
        });

        self.evict(&mut manifest);
        self.write_manifest(&manifest)
    }

    fn evict(&self, manifest: &mut Manifest) {
        while manifest.total_size() > self.max_size_bytes && !manifest.entries.is_empty() {
            let Some(oldest) = manifest
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(i, _)| i)
            else {
                break;
            };
            let entry = manifest.entries.remove(oldest);
            let path = self.entry_path(&entry.file_name);
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Evicted cache entry {:?}", path),
                Err(e) => warn!("Failed to evict cache entry {:?}: {}", path, e),
            }
        }
    }
}

impl TimelineCache for DiskTimelineCache {
    fn load(&self, key: &SingleTimelineKey) -> Result<Option<CachedTimeline>> {
        self.load_where(|k| matches!(k, EntryKey::Single(stored) if stored == key))
    }

    fn load_range(&self, key: &RangeTimelineKey) -> Result<Option<CachedTimelines>> {
        self.load_where(|k| matches!(k, EntryKey::Range(stored) if stored.covers(key)))
    }

    fn save(&self, key: &SingleTimelineKey, timeline: &[f64], creation_date: Option<&str>) -> Result<()> {
        let data = CachedTimeline {
            timeline: timeline.to_vec(),
            creation_date: creation_date.map(str::to_string),
        };
        self.store(EntryKey::Single(key.clone()), &data)
    }

    fn save_range(
        &self,
        key: &RangeTimelineKey,
        timelines: &TimelineMap,
        creation_date: Option<&str>,
    ) -> Result<()> {
        let data = CachedTimelines {
            timelines: timelines.clone(),
            creation_date: creation_date.map(str::to_string),
        };
        self.store(EntryKey::Range(key.clone()), &data)
    }
}
