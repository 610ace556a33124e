use regex::Regex;
use std::io::{
    BufRead,
    Read,
    Seek,
    SeekFrom,
};
use std::sync::LazyLock;

use crate::models::MzBounds;

const REVERSE_CHUNK_SIZE: u64 = 8192;

static SCAN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"scan=(\d+)").expect("This is valid regex"));

fn last_scan_in_lines(text: &str) -> Option<u32> {
    text.lines()
        .rev()
        .find_map(|line| SCAN_REGEX.captures(line)?.get(1)?.as_str().parse().ok())
}

/// Reads `reader` backwards in fixed chunks and returns the last `scan=<N>` value.
///
/// A line cut by a chunk boundary is held back and completed with the next
/// (earlier) chunk before it is searched.
pub fn count_scans_in<R: Read + Seek>(reader: &mut R) -> std::io::Result<Option<u32>> {
    let mut position = reader.seek(SeekFrom::End(0))?;
    // Bytes of the earliest, possibly incomplete, line seen so far.
    let mut carry: Vec<u8> = Vec::new();

    while position > 0 {
        let read_size = REVERSE_CHUNK_SIZE.min(position);
        position -= read_size;
        reader.seek(SeekFrom::Start(position))?;

        let mut chunk = vec![0u8; read_size as usize];
        reader.read_exact(&mut chunk)?;
        chunk.extend_from_slice(&carry);

        let split_at = if position == 0 {
            0
        } else {
            match chunk.iter().position(|&b| b == b'\n') {
                Some(idx) => idx + 1,
                None => {
                    carry = chunk;
                    continue;
                }
            }
        };

        let complete = String::from_utf8_lossy(&chunk[split_at..]);
        if let Some(scan) = last_scan_in_lines(&complete) {
            return Ok(Some(scan));
        }
        carry = chunk[..split_at].to_vec();
    }

    Ok(None)
}

fn first_token_mz(line: &str) -> Option<f64> {
    line.split_whitespace().next()?.parse().ok()
}

fn starts_with_digit(line: &str) -> bool {
    line.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Single forward pass estimating global m/z bounds.
///
/// The first data line after an `I` line is taken as the lowest m/z of its
/// scan and the data line right before an `S` line as the highest. Function
/// ids are not looked at. Returns `None` when neither bound was seen.
pub fn mz_bounds_in<R: BufRead>(reader: R) -> std::io::Result<Option<MzBounds>> {
    let mut max_mz = f64::NEG_INFINITY;
    let mut min_mz = f64::INFINITY;

    let mut previous_line = String::new();
    let mut previous_line_digit = false;
    let mut awaiting_first_reading = true;

    for line in reader.lines() {
        let line = line?;
        if previous_line_digit && line.starts_with('S') {
            if let Some(mz) = first_token_mz(&previous_line) {
                max_mz = max_mz.max(mz);
            }
            awaiting_first_reading = true;
            previous_line_digit = false;
            previous_line = line;
            continue;
        }

        if awaiting_first_reading && previous_line.starts_with('I') {
            previous_line_digit = starts_with_digit(&line);
            if previous_line_digit {
                if let Some(mz) = first_token_mz(&line) {
                    min_mz = min_mz.min(mz);
                }
                awaiting_first_reading = false;
            }
        }

        previous_line = line;
    }

    if min_mz == f64::INFINITY && max_mz == f64::NEG_INFINITY {
        return Ok(None);
    }
    Ok(Some(MzBounds { min_mz, max_mz }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn synthetic_file(num_scans: u32, readings_per_scan: usize) -> String {
        let mut out = String::from("H\tCreationDate\ttoday\n");
        for scan in 1..=num_scans {
            out.push_str(&format!("S\t{scan}\t{scan}\n"));
            out.push_str(&format!("I\tfunction=1\tscan={scan}\n"));
            for i in 0..readings_per_scan {
                out.push_str(&format!("{:.4} {}\n", 100.0 + i as f64 * 0.5, i * 10));
            }
        }
        out
    }

    #[test]
    fn test_count_scans_small_file() {
        let text = synthetic_file(3, 2);
        let found = count_scans_in(&mut Cursor::new(text.into_bytes())).unwrap();
        assert_eq!(found, Some(3));
    }

    #[test]
    fn test_count_scans_spans_many_chunks() {
        // Last scan header followed by more than one chunk of readings.
        let text = synthetic_file(42, 1500);
        assert!(text.len() as u64 > 4 * REVERSE_CHUNK_SIZE);
        let found = count_scans_in(&mut Cursor::new(text.into_bytes())).unwrap();
        assert_eq!(found, Some(42));
    }

    #[test]
    fn test_count_scans_token_cut_by_chunk_boundary() {
        let tail = "S\t1\t1\nI\tfunction=1\tscan=987654\n";
        // Place the chunk boundary inside the scan number.
        let pad_len = REVERSE_CHUNK_SIZE as usize - 3;
        let mut text = String::from(tail);
        text.push_str(&"1".repeat(pad_len));
        text.push('\n');
        let prefix_len = text.len() - REVERSE_CHUNK_SIZE as usize;
        assert!(prefix_len < tail.len());
        let found = count_scans_in(&mut Cursor::new(text.into_bytes())).unwrap();
        assert_eq!(found, Some(987654));
    }

    #[test]
    fn test_count_scans_none() {
        let found = count_scans_in(&mut Cursor::new(b"H\tnothing\n1.0 2.0\n".to_vec())).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_mz_bounds_uses_scan_edges() {
        let text = "S\t1\nI\tfunction=1\tscan=1\n100.5 1\n150.0 1\n200.25 1\nS\t2\nI\tfunction=1\tscan=2\n99.0 1\n180.0 1\nS\t3\n";
        let bounds = mz_bounds_in(Cursor::new(text)).unwrap().unwrap();
        assert_eq!(bounds.min_mz, 99.0);
        assert_eq!(bounds.max_mz, 200.25);
    }

    #[test]
    fn test_mz_bounds_is_not_function_filtered() {
        // Function 2 readings widen the bounds even though only function 1
        // would be analyzed.
        let text = "S\t1\nI\tfunction=1\tscan=1\n100.0 1\n110.0 1\nS\t2\nI\tfunction=2\tscan=2\n10.0 1\n900.0 1\nS\t3\n";
        let bounds = mz_bounds_in(Cursor::new(text)).unwrap().unwrap();
        assert_eq!(bounds.min_mz, 10.0);
        assert_eq!(bounds.max_mz, 900.0);
    }

    #[test]
    fn test_mz_bounds_without_boundaries() {
        assert_eq!(mz_bounds_in(Cursor::new("H\tx\n1.0 2.0\n")).unwrap(), None);
    }
}
