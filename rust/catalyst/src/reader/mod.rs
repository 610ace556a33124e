//! Reader for line-tagged scan text files.
//!
//! Every line is classified by its first character:
//!
//! * `H`: header, may carry `CreationDate <text>`.
//! * `S`: scan boundary.
//! * `I`: scan metadata, `function=<n>` and/or `scan=<n>`.
//! * digit: a `<mz> <intensity>` reading of the active scan.

mod fast_scan;

pub use fast_scan::{
    count_scans_in,
    mz_bounds_in,
};

use regex::Regex;
use std::fs::File;
use std::io::{
    BufRead,
    BufReader,
};
use std::path::{
    Path,
    PathBuf,
};
use std::sync::LazyLock;
use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};
use std::time::Instant;
use tracing::{
    debug,
    instrument,
};

use crate::errors::{
    DataReadingError,
    Result,
};
use crate::models::{
    MzBounds,
    Reading,
    ScanContent,
};
use crate::progress::ProgressSink;

static METADATA_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"function=(\d+)|scan=(\d+)").expect("metadata regex is valid")
});

const CREATION_DATE_TOKEN: &str = "CreationDate";

#[derive(Debug)]
pub struct ScanFileReader {
    path: PathBuf,
    parse_count: AtomicUsize,
}

impl ScanFileReader {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(DataReadingError::FileNotFound(path).into());
        }
        Ok(Self {
            path,
            parse_count: AtomicUsize::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without directory or extension, used to key cached timelines.
    pub fn file_stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Number of full parses performed so far.
    pub fn parse_count(&self) -> usize {
        self.parse_count.load(Ordering::Relaxed)
    }

    fn open(&self) -> Result<BufReader<File>> {
        let file = File::open(&self.path).map_err(|source| self.io_error(source))?;
        Ok(BufReader::new(file))
    }

    fn io_error(&self, source: std::io::Error) -> DataReadingError {
        if source.kind() == std::io::ErrorKind::NotFound {
            DataReadingError::FileNotFound(self.path.clone())
        } else {
            DataReadingError::Io {
                source,
                path: self.path.clone(),
            }
        }
    }

    /// Parses every scan of `function`, discarding all other functions.
    #[instrument(skip(self, progress), fields(path = %self.path.display()))]
    pub fn parse(&self, function: u32, progress: &dyn ProgressSink) -> Result<ScanContent> {
        progress.log(&format!("Start parsing file at '{}'.", self.path.display()));
        let start = Instant::now();
        let reader = self.open()?;
        let content = parse_scan_lines(reader, function).map_err(|e| match e {
            ParseFailure::Io(source) => self.io_error(source),
            ParseFailure::Malformed(e) => e,
        })?;
        self.parse_count.fetch_add(1, Ordering::Relaxed);
        progress.log(&format!(
            "Finished parsing {} scans in {:.2} seconds.",
            content.num_scans(),
            start.elapsed().as_secs_f64()
        ));
        Ok(content)
    }

    /// The last `scan=<N>` value in the file, found by reading backwards.
    pub fn count_scans(&self) -> Result<u32> {
        let mut file = File::open(&self.path).map_err(|source| self.io_error(source))?;
        let found = count_scans_in(&mut file).map_err(|source| self.io_error(source))?;
        debug!("Found {:?} scans in {}", found, self.path.display());
        found.ok_or_else(|| DataReadingError::NoScanInformation(self.path.clone()).into())
    }

    /// Approximate m/z bounds from the first and last reading of each scan.
    ///
    /// This pass looks at every function in the file, so the bounds may be
    /// wider than those of the function that is later parsed.
    pub fn mz_bounds(&self, progress: &dyn ProgressSink) -> Result<MzBounds> {
        let start = Instant::now();
        let reader = self.open()?;
        let bounds = mz_bounds_in(reader)
            .map_err(|source| self.io_error(source))?
            .ok_or_else(|| DataReadingError::NoMzBounds(self.path.clone()))?;
        progress.log(&format!("Max m/z: {}.", bounds.max_mz));
        progress.log(&format!("Min m/z: {}.", bounds.min_mz));
        progress.log(&format!(
            "Time taken to get max and min m/z values: {:.2} seconds.",
            start.elapsed().as_secs_f64()
        ));
        Ok(bounds)
    }
}

#[derive(Debug)]
pub(crate) enum ParseFailure {
    Io(std::io::Error),
    Malformed(DataReadingError),
}

impl From<std::io::Error> for ParseFailure {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[derive(Debug, Default)]
struct ActiveScan {
    function: Option<u32>,
    scan: Option<u32>,
    readings: Vec<Reading>,
}

impl ActiveScan {
    fn flush_into(&mut self, target: u32, content: &mut ScanContent) {
        if let (Some(function), Some(scan)) = (self.function, self.scan) {
            if function == target {
                content
                    .scans
                    .insert(scan, std::mem::take(&mut self.readings));
            }
        }
        self.function = None;
        self.scan = None;
        self.readings.clear();
    }
}

fn parse_reading(line: &str, line_number: usize) -> std::result::Result<Reading, DataReadingError> {
    let mut tokens = line.split_whitespace();
    let parsed = match (tokens.next(), tokens.next()) {
        (Some(mz), Some(intensity)) => mz.parse::<f64>().ok().zip(intensity.parse::<f64>().ok()),
        _ => None,
    };
    parsed
        .map(|(mz, intensity)| Reading { mz, intensity })
        .ok_or_else(|| DataReadingError::MalformedLine {
            line_number,
            line: line.to_string(),
        })
}

pub(crate) fn parse_scan_lines<R: BufRead>(
    reader: R,
    function: u32,
) -> std::result::Result<ScanContent, ParseFailure> {
    let mut content = ScanContent {
        function,
        ..Default::default()
    };
    let mut active = ActiveScan::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let Some(first) = line.chars().next() else {
            continue;
        };
        match first {
            c if c.is_ascii_digit() => {
                if active.function == Some(function) {
                    let reading = parse_reading(&line, idx + 1).map_err(ParseFailure::Malformed)?;
                    active.readings.push(reading);
                }
            }
            'S' => active.flush_into(function, &mut content),
            'I' => {
                for caps in METADATA_REGEX.captures_iter(&line) {
                    if let Some(f) = caps.get(1) {
                        active.function = f.as_str().parse().ok();
                    } else if let Some(s) = caps.get(2) {
                        active.scan = s.as_str().parse().ok();
                    }
                }
            }
            'H' => {
                if let Some((_, date)) = line.split_once(CREATION_DATE_TOKEN) {
                    content.creation_date = Some(date.trim().to_string());
                }
            }
            _ => {}
        }
    }
    active.flush_into(function, &mut content);

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "H\tCreationDate\t2024-03-01 10:00\n\
H\tInstrument\tsomething\n\
S\t1\t1\n\
I\tfunction=1\n\
I\tscan=1\n\
100.0 10\n\
100.02 20\n\
S\t2\t2\n\
I\tfunction=2 scan=2\n\
300.0 1\n\
S\t3\t3\n\
I\tfunction=1 scan=3\n\
100.01 5\n\
S\t4\t4\n\
I\tfunction=1 scan=4\n";

    fn parse(text: &str, function: u32) -> ScanContent {
        match parse_scan_lines(Cursor::new(text), function) {
            Ok(c) => c,
            Err(e) => panic!("parse failed: {:?}", e),
        }
    }

    #[test]
    fn test_parse_keeps_only_target_function() {
        let content = parse(SAMPLE, 1);
        assert_eq!(content.scans.keys().copied().collect::<Vec<_>>(), vec![1, 3, 4]);
        assert_eq!(
            content.scans[&1],
            vec![Reading::new(100.0, 10.0), Reading::new(100.02, 20.0)]
        );
        assert_eq!(content.scans[&3], vec![Reading::new(100.01, 5.0)]);
        // The trailing scan has no readings and no closing boundary.
        assert!(content.scans[&4].is_empty());

        let other = parse(SAMPLE, 2);
        assert_eq!(other.scans.len(), 1);
        assert_eq!(other.scans[&2], vec![Reading::new(300.0, 1.0)]);
    }

    #[test]
    fn test_parse_creation_date() {
        let content = parse(SAMPLE, 1);
        assert_eq!(content.creation_date.as_deref(), Some("2024-03-01 10:00"));
    }

    #[test]
    fn test_parse_ignores_malformed_lines_of_other_functions() {
        let text = "S\t1\t1\nI\tfunction=2\tscan=1\n12 not-a-number\nS\t2\t2\nI\tfunction=1\tscan=2\n5.0 1.0\n";
        let content = parse(text, 1);
        assert_eq!(content.scans[&2], vec![Reading::new(5.0, 1.0)]);
    }

    #[test]
    fn test_parse_reports_malformed_line_number() {
        let text = "S\t1\t1\nI\tfunction=1\tscan=1\n12 not-a-number\n";
        match parse_scan_lines(Cursor::new(text), 1) {
            Err(ParseFailure::Malformed(DataReadingError::MalformedLine { line_number, .. })) => {
                assert_eq!(line_number, 3)
            }
            other => panic!("expected malformed line error, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_without_number_is_dropped() {
        let text = "S\nI\tfunction=1\n1.0 2.0\nS\nI\tfunction=1\tscan=7\n3.0 4.0\n";
        let content = parse(text, 1);
        assert_eq!(content.scans.len(), 1);
        assert!(content.scans.contains_key(&7));
    }

    #[test]
    fn test_missing_file() {
        let err = ScanFileReader::new("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(
            err,
            crate::errors::CatalystError::DataReading(DataReadingError::FileNotFound(_))
        ));
    }
}
