//! Turns parsed scans into m/z-binned intensity timelines.

pub mod binning;

use std::time::Instant;
use tracing::instrument;

use crate::cache::{
    RangeTimelineKey,
    SingleTimelineKey,
    TimelineCache,
};
use crate::errors::{
    DataProcessingError,
    Result,
};
use crate::models::{
    BinSpec,
    MzBounds,
    Reading,
    ScanContent,
    Timeline,
    TimelineMap,
    radius_from_area,
};
use crate::progress::ProgressSink;
use crate::reader::ScanFileReader;
use crate::utils::parallel::{
    clamp_workers,
    try_parallel_map,
};
use binning::{
    ChunkSums,
    accumulate_chunk,
    merge_chunks,
    partition_chunks,
    single_bin_timeline,
};

/// Cores kept free when aggregating the full spectrum.
const RESERVED_AGGREGATION_CORES: usize = 2;

/// Computes timelines for one scan file, consulting a cache first.
///
/// Parsed content of the last requested function is kept in memory so
/// repeated queries on the same function parse the file only once.
pub struct TimelineAggregator<'a> {
    reader: ScanFileReader,
    cache: &'a dyn TimelineCache,
    progress: &'a dyn ProgressSink,
    content: Option<ScanContent>,
    bounds: Option<MzBounds>,
    creation_date: Option<String>,
}

impl<'a> TimelineAggregator<'a> {
    pub fn new(
        reader: ScanFileReader,
        cache: &'a dyn TimelineCache,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            reader,
            cache,
            progress,
            content: None,
            bounds: None,
            creation_date: None,
        }
    }

    pub fn reader(&self) -> &ScanFileReader {
        &self.reader
    }

    pub fn progress(&self) -> &'a dyn ProgressSink {
        self.progress
    }

    /// Creation date of the most recently loaded or computed data.
    pub fn creation_date(&self) -> Option<&str> {
        self.creation_date.as_deref()
    }

    fn ensure_loaded(&mut self, function: u32) -> Result<(&ScanContent, MzBounds)> {
        let reload = !matches!(&self.content, Some(c) if c.function == function);
        if reload {
            let content = self.reader.parse(function, self.progress)?;
            self.creation_date = content.creation_date.clone();
            self.content = Some(content);
        }
        let bounds = match self.bounds {
            Some(b) => b,
            None => {
                let b = self.reader.mz_bounds(self.progress)?;
                self.bounds = Some(b);
                b
            }
        };
        match &self.content {
            Some(content) => Ok((content, bounds)),
            None => Err(DataProcessingError::ExpectedNonEmptyData {
                context: "parsed scan content".to_string(),
            }
            .into()),
        }
    }

    /// Timeline of a single m/z value.
    ///
    /// Each scan contributes the mean intensity of its readings within
    /// `[mz - radius, mz + radius)` where `radius = area_range / 2`.
    #[instrument(skip(self), level = "debug")]
    pub fn get_intensity_timeline(
        &mut self,
        mz: f64,
        area_range: f64,
        function: u32,
        use_cache: bool,
    ) -> Result<Timeline> {
        self.progress
            .log(&format!("Calculating intensity timeline for {} m/z...", mz));
        let key = SingleTimelineKey {
            file_stem: self.reader.file_stem(),
            bin_width: area_range,
            function,
            mz,
        };

        if use_cache {
            match self.cache.load(&key) {
                Ok(Some(hit)) => {
                    self.progress.log("Cache hit. Returning cached timeline.");
                    self.creation_date = hit.creation_date;
                    return Ok(hit.timeline);
                }
                Ok(None) => self.progress.log("Cache miss. Starting processing data."),
                Err(e) => self
                    .progress
                    .error(&format!("Failed to read timeline cache: {}", e)),
            }
        } else {
            self.progress.log("Cache disabled. Starting processing data.");
        }

        let radius = radius_from_area(area_range);
        let (content, bounds) = self.ensure_loaded(function)?;
        if !bounds.contains_with_margin(mz, radius) {
            return Err(DataProcessingError::NoDataForMz {
                mz,
                min_mz: bounds.min_mz,
                max_mz: bounds.max_mz,
            }
            .into());
        }
        let timeline = single_bin_timeline(content, mz, radius);
        self.progress
            .log(&format!("Intensity timeline for {} m/z created.", mz));

        if use_cache {
            if let Err(e) = self
                .cache
                .save(&key, &timeline, self.creation_date.as_deref())
            {
                self.progress
                    .error(&format!("Failed to save timeline to cache: {}", e));
            }
        }
        Ok(timeline)
    }

    /// Timelines of every bin in `[start_value, end_value)`.
    ///
    /// Scans are split into contiguous chunks aggregated on separate workers
    /// (capped two below the core count). Any failing chunk fails the call
    /// and nothing is cached.
    #[instrument(skip(self), level = "debug")]
    pub fn get_all_intensity_timelines(
        &mut self,
        area_range: f64,
        start_value: f64,
        end_value: f64,
        function: u32,
        num_workers: usize,
        use_cache: bool,
    ) -> Result<TimelineMap> {
        let start_time = Instant::now();
        self.progress.log(&format!(
            "Calculating all intensity timelines for {}...",
            self.reader.path().display()
        ));
        let key = RangeTimelineKey {
            file_stem: self.reader.file_stem(),
            bin_width: area_range,
            function,
            start: start_value,
            end: end_value,
        };

        if use_cache {
            match self.cache.load_range(&key) {
                Ok(Some(hit)) => {
                    self.progress.log("Cache hit. Returning cached timelines.");
                    self.creation_date = hit.creation_date;
                    return Ok(hit.timelines);
                }
                Ok(None) => self.progress.log("Cache miss. Starting processing data."),
                Err(e) => self
                    .progress
                    .error(&format!("Failed to read timeline cache: {}", e)),
            }
        } else {
            self.progress.log("Cache disabled. Starting processing data.");
        }

        let spec = BinSpec::new(area_range, start_value, end_value);
        let progress = self.progress;
        let (content, bounds) = self.ensure_loaded(function)?;
        if !bounds.overlaps_with_margin(start_value, end_value, spec.radius) {
            return Err(DataProcessingError::NoDataInRegion {
                start: start_value,
                end: end_value,
                min_mz: bounds.min_mz,
                max_mz: bounds.max_mz,
            }
            .into());
        }

        let num_workers = clamp_workers(num_workers, RESERVED_AGGREGATION_CORES);
        let scans: Vec<(u32, &[Reading])> = content
            .scans
            .iter()
            .map(|(id, readings)| (*id, readings.as_slice()))
            .collect();
        let scan_order: Vec<u32> = scans.iter().map(|(id, _)| *id).collect();
        let chunks = partition_chunks(scans.len(), num_workers);
        progress.log(&format!(
            "Starting {} workers to calculate timelines over {} chunks...",
            num_workers,
            chunks.len()
        ));

        let partials: Vec<ChunkSums> = try_parallel_map(
            &chunks,
            |range| {
                let chunk_start = Instant::now();
                let sums = accumulate_chunk(&scans[range.clone()], &spec);
                progress.log(&format!(
                    "Finished processing a chunk with {} scans in {:.2} seconds.",
                    range.len(),
                    chunk_start.elapsed().as_secs_f64()
                ));
                Ok(sums)
            },
            num_workers,
            1,
        )?;

        progress.log("Combining chunks into complete timelines...");
        let timelines = merge_chunks(partials, &scan_order);

        if use_cache {
            if let Err(e) = self
                .cache
                .save_range(&key, &timelines, self.creation_date.as_deref())
            {
                self.progress
                    .error(&format!("Failed to save timelines to cache: {}", e));
            }
        }

        self.progress.log("All intensity timelines created.");
        self.progress.log(&format!(
            "Processing time: {:.2} seconds.",
            start_time.elapsed().as_secs_f64()
        ));
        Ok(timelines)
    }
}
