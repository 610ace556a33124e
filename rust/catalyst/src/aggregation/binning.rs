use std::collections::{
    BTreeMap,
    HashMap,
};
use std::ops::Range;

use crate::models::{
    BinCenter,
    BinSpec,
    BinWindow,
    Reading,
    ScanContent,
    Timeline,
    TimelineMap,
};

/// Per-scan partial sum of one bin inside a chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinCell {
    pub scan_id: u32,
    pub intensity_sum: f64,
    pub count: u32,
}

/// Partial sums of every bin touched by one chunk of scans.
///
/// Each bin holds exactly one cell per scan of the chunk, in scan order.
pub type ChunkSums = BTreeMap<BinCenter, Vec<BinCell>>;

/// Mean intensity of the readings inside `window`, or 0 when there are none.
///
/// `readings` must be sorted by m/z.
pub fn mean_in_window(readings: &[Reading], window: &BinWindow) -> f64 {
    let first = readings.partition_point(|r| window.starts_after(r.mz));
    let last = first + readings[first..].partition_point(|r| window.ends_after(r.mz));
    let inside = &readings[first..last];
    if inside.is_empty() {
        return 0.0;
    }
    inside.iter().map(|r| r.intensity).sum::<f64>() / inside.len() as f64
}

/// Timeline of the bin `[mz - radius, mz + radius)`, one value per scan.
pub fn single_bin_timeline(content: &ScanContent, mz: f64, radius: f64) -> Timeline {
    let window = BinWindow::around(mz, radius);
    content
        .scans
        .values()
        .map(|readings| mean_in_window(readings, &window))
        .collect()
}

/// Splits `len` items into `num_chunks` contiguous ranges of `len / num_chunks`
/// items, the remainder going to the last one. Empty ranges are dropped.
pub fn partition_chunks(len: usize, num_chunks: usize) -> Vec<Range<usize>> {
    let num_chunks = num_chunks.max(1);
    let chunk_size = (len / num_chunks).max(1);
    (0..num_chunks)
        .map(|i| {
            let start = (i * chunk_size).min(len);
            let end = if i + 1 == num_chunks {
                len
            } else {
                ((i + 1) * chunk_size).min(len)
            };
            start..end
        })
        .filter(|r| !r.is_empty())
        .collect()
}

/// Sums readings of a chunk of scans into bins.
///
/// A bin first seen in a later scan is back-filled with empty cells so
/// every bin stays aligned with the scans of the chunk.
pub fn accumulate_chunk(scans: &[(u32, &[Reading])], spec: &BinSpec) -> ChunkSums {
    let mut sums = ChunkSums::new();
    for (position, (scan_id, readings)) in scans.iter().enumerate() {
        for reading in readings.iter() {
            let Some(center) = spec.bin_for(reading.mz) else {
                continue;
            };
            let cells = sums.entry(center).or_insert_with(|| {
                scans[..position]
                    .iter()
                    .map(|(id, _)| BinCell {
                        scan_id: *id,
                        intensity_sum: 0.0,
                        count: 0,
                    })
                    .collect()
            });
            if cells.len() <= position {
                cells.push(BinCell {
                    scan_id: *scan_id,
                    intensity_sum: 0.0,
                    count: 0,
                });
            }
            let cell = &mut cells[position];
            cell.intensity_sum += reading.intensity;
            cell.count += 1;
        }
        for cells in sums.values_mut() {
            if cells.len() <= position {
                cells.push(BinCell {
                    scan_id: *scan_id,
                    intensity_sum: 0.0,
                    count: 0,
                });
            }
        }
    }
    sums
}

/// Merges chunk partial sums and turns them into mean intensities.
///
/// `scan_order` is the scan id of every timeline position.
pub fn merge_chunks(chunks: Vec<ChunkSums>, scan_order: &[u32]) -> TimelineMap {
    let position_of: HashMap<u32, usize> = scan_order
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();
    let num_scans = scan_order.len();

    let mut totals: BTreeMap<BinCenter, Vec<(f64, u32)>> = BTreeMap::new();
    for chunk in chunks {
        for (center, cells) in chunk {
            let acc = totals
                .entry(center)
                .or_insert_with(|| vec![(0.0, 0); num_scans]);
            for cell in cells {
                if let Some(&pos) = position_of.get(&cell.scan_id) {
                    acc[pos].0 += cell.intensity_sum;
                    acc[pos].1 += cell.count;
                }
            }
        }
    }

    totals
        .into_iter()
        .map(|(center, acc)| {
            let timeline = acc
                .into_iter()
                .map(|(sum, count)| if count == 0 { 0.0 } else { sum / count as f64 })
                .collect();
            (center, timeline)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(values: &[(f64, f64)]) -> Vec<Reading> {
        values.iter().copied().map(Reading::from).collect()
    }

    #[test]
    fn test_mean_in_window_half_open() {
        let r = readings(&[(99.9, 1.0), (99.95, 2.0), (100.0, 4.0), (100.05, 8.0)]);
        assert_eq!(mean_in_window(&r, &BinWindow::around(100.0, 0.05)), 3.0);
        assert_eq!(mean_in_window(&r, &BinWindow::around(200.5, 0.5)), 0.0);
        assert_eq!(mean_in_window(&[], &BinWindow::around(0.5, 0.5)), 0.0);
    }

    #[test]
    fn test_partition_chunks() {
        assert_eq!(partition_chunks(10, 3), vec![0..3, 3..6, 6..10]);
        assert_eq!(partition_chunks(10, 1), vec![0..10]);
        assert_eq!(partition_chunks(2, 4), vec![0..1, 1..2]);
        assert!(partition_chunks(0, 4).is_empty());
    }

    #[test]
    fn test_accumulate_chunk_aligns_bins() {
        let spec = BinSpec::new(0.1, 100.0, 101.0);
        let s1 = readings(&[(100.0, 10.0), (100.02, 20.0)]);
        let s2: Vec<Reading> = vec![];
        let s3 = readings(&[(100.31, 3.0)]);
        let scans: Vec<(u32, &[Reading])> = vec![(1, &s1[..]), (2, &s2[..]), (3, &s3[..])];
        let sums = accumulate_chunk(&scans, &spec);

        let first = &sums[&BinCenter::from_mz(100.0)];
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].intensity_sum, 30.0);
        assert_eq!(first[0].count, 2);
        assert_eq!(first[1].count, 0);
        assert_eq!(first[2].scan_id, 3);

        let late = &sums[&BinCenter::from_mz(100.3)];
        assert_eq!(
            late.iter().map(|c| c.scan_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(late[2].intensity_sum, 3.0);
    }

    #[test]
    fn test_merge_chunks_divides_sums() {
        let spec = BinSpec::new(0.1, 100.0, 101.0);
        let s1 = readings(&[(100.0, 10.0), (100.02, 20.0)]);
        let s2 = readings(&[(100.01, 5.0)]);
        let chunk_a = accumulate_chunk(&[(1, &s1[..])], &spec);
        let chunk_b = accumulate_chunk(&[(2, &s2[..]), (3, &[][..])], &spec);
        let merged = merge_chunks(vec![chunk_a, chunk_b], &[1, 2, 3]);
        assert_eq!(merged[&BinCenter::from_mz(100.0)], vec![15.0, 5.0, 0.0]);
    }

    #[test]
    fn test_every_reading_counted_once() {
        // (area range, grid start, reading step in 1e-4 m/z)
        for (area, start, step) in [(0.04, 100.0, 130), (0.1, 100.0, 100), (0.02, 300.0, 50)] {
            let spec = BinSpec::new(area, start, start + 1.0);
            let first = ((start - spec.radius) * 10_000.0).round() as i64;
            let scan: Vec<Reading> = (0..10_000 / step)
                .map(|k| Reading::new((first + k * step) as f64 / 10_000.0, 1.0))
                .collect();
            let sums = accumulate_chunk(&[(1, &scan[..])], &spec);

            let counted: u32 = sums.values().map(|cells| cells[0].count).sum();
            assert_eq!(counted as usize, scan.len(), "area {}", area);
            for reading in &scan {
                let owners = sums
                    .keys()
                    .filter(|center| spec.window(**center).contains(reading.mz))
                    .count();
                assert_eq!(owners, 1, "{} with area {}", reading.mz, area);
            }
        }
    }
}
