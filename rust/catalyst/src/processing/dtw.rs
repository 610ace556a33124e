//! Approximate dynamic time warping (FastDTW).
//!
//! The series is halved recursively until it is short enough for an exact
//! solve. The coarse warping path is then projected to the finer
//! resolution, widened by `radius` cells, and the exact recurrence is only
//! evaluated inside that window. Runtime is linear in the series length for
//! a fixed radius.

use std::collections::HashSet;

/// A point of a series, `(index, value)`.
pub type Point = [f64; 2];

/// Warping path as pairs of indices into the two series.
pub type WarpPath = Vec<(usize, usize)>;

fn l1_distance(a: &Point, b: &Point) -> f64 {
    (a[0] - b[0]).abs() + (a[1] - b[1]).abs()
}

fn reduce_by_half(x: &[Point]) -> Vec<Point> {
    x.chunks_exact(2)
        .map(|pair| [(pair[0][0] + pair[1][0]) / 2.0, (pair[0][1] + pair[1][1]) / 2.0])
        .collect()
}

/// Contiguous run of columns evaluated for one row.
#[derive(Debug, Clone)]
struct WindowRow {
    start: usize,
    end: usize,
}

fn full_window(len_x: usize, len_y: usize) -> Vec<WindowRow> {
    (0..len_x)
        .map(|_| WindowRow {
            start: 0,
            end: len_y,
        })
        .collect()
}

fn expand_window(path: &[(usize, usize)], len_x: usize, len_y: usize, radius: usize) -> Vec<WindowRow> {
    let r = radius as isize;
    let mut widened: HashSet<(isize, isize)> = HashSet::new();
    for &(i, j) in path {
        for a in -r..=r {
            for b in -r..=r {
                widened.insert((i as isize + a, j as isize + b));
            }
        }
    }

    let mut cells: HashSet<(isize, isize)> = HashSet::with_capacity(widened.len() * 4);
    for (i, j) in widened {
        cells.insert((i * 2, j * 2));
        cells.insert((i * 2, j * 2 + 1));
        cells.insert((i * 2 + 1, j * 2));
        cells.insert((i * 2 + 1, j * 2 + 1));
    }

    // Each row keeps the first run of window cells at or after the run
    // start of the previous row.
    let mut rows = Vec::with_capacity(len_x);
    let mut start_j = 0usize;
    for i in 0..len_x {
        let mut run: Option<WindowRow> = None;
        for j in start_j..len_y {
            if cells.contains(&(i as isize, j as isize)) {
                match run.as_mut() {
                    Some(row) => row.end = j + 1,
                    None => {
                        run = Some(WindowRow {
                            start: j,
                            end: j + 1,
                        })
                    }
                }
            } else if run.is_some() {
                break;
            }
        }
        match run {
            Some(row) => {
                start_j = row.start;
                rows.push(row);
            }
            None => rows.push(WindowRow {
                start: start_j,
                end: start_j,
            }),
        }
    }
    rows
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Up,
    Left,
    Diagonal,
}

/// Exact DTW restricted to `window` (one column run per row of `x`).
fn windowed_dtw(x: &[Point], y: &[Point], window: &[WindowRow]) -> (f64, WarpPath) {
    let len_x = x.len();
    let len_y = y.len();
    let mut costs: Vec<Vec<f64>> = Vec::with_capacity(len_x);
    let mut steps: Vec<Vec<Step>> = Vec::with_capacity(len_x);

    // Cumulative cost of cell (i, j) in 1-based coordinates; (0, 0) is the origin.
    let cost_at = |costs: &Vec<Vec<f64>>, i: usize, j: usize| -> f64 {
        if i == 0 && j == 0 {
            return 0.0;
        }
        if i == 0 || j == 0 {
            return f64::INFINITY;
        }
        let row = &window[i - 1];
        let col = j - 1;
        if col >= row.start && col < row.end {
            costs[i - 1][col - row.start]
        } else {
            f64::INFINITY
        }
    };

    for i in 1..=len_x {
        let row = &window[i - 1];
        let mut row_costs = Vec::with_capacity(row.end - row.start);
        let mut row_steps = Vec::with_capacity(row.end - row.start);
        for j in (row.start + 1)..=row.end {
            let dt = l1_distance(&x[i - 1], &y[j - 1]);
            let up = cost_at(&costs, i - 1, j);
            // The current row is not in `costs` yet.
            let left = if j - 1 > row.start {
                row_costs[j - 2 - row.start]
            } else {
                f64::INFINITY
            };
            let diagonal = cost_at(&costs, i - 1, j - 1);

            let (mut best, mut step) = (up, Step::Up);
            if left < best {
                best = left;
                step = Step::Left;
            }
            if diagonal < best {
                best = diagonal;
                step = Step::Diagonal;
            }
            row_costs.push(best + dt);
            row_steps.push(step);
        }
        costs.push(row_costs);
        steps.push(row_steps);
    }

    let distance = cost_at(&costs, len_x, len_y);
    let mut path = Vec::new();
    if !distance.is_finite() {
        return (distance, path);
    }
    let (mut i, mut j) = (len_x, len_y);
    while i > 0 && j > 0 {
        path.push((i - 1, j - 1));
        let row = &window[i - 1];
        match steps[i - 1][j - 1 - row.start] {
            Step::Up => i -= 1,
            Step::Left => j -= 1,
            Step::Diagonal => {
                i -= 1;
                j -= 1;
            }
        }
    }
    path.reverse();
    (distance, path)
}

/// FastDTW distance and warping path between two point series.
pub fn fast_dtw(x: &[Point], y: &[Point], radius: usize) -> (f64, WarpPath) {
    let min_time_size = radius + 2;
    if x.len() < min_time_size || y.len() < min_time_size {
        return windowed_dtw(x, y, &full_window(x.len(), y.len()));
    }
    let x_shrunk = reduce_by_half(x);
    let y_shrunk = reduce_by_half(y);
    let (_, coarse_path) = fast_dtw(&x_shrunk, &y_shrunk, radius);
    let window = expand_window(&coarse_path, x.len(), y.len(), radius);
    windowed_dtw(x, y, &window)
}

fn centered_points(curve: &[f64]) -> Vec<Point> {
    let mean = if curve.is_empty() {
        0.0
    } else {
        curve.iter().sum::<f64>() / curve.len() as f64
    };
    curve
        .iter()
        .enumerate()
        .map(|(idx, v)| [idx as f64, v - mean])
        .collect()
}

/// FastDTW distance between two mean-centered curves, radius 1.
///
/// Each sample becomes the point `(index, value)` and points are compared
/// with the L1 distance. Returns `None` when either curve is empty or the
/// distance is not finite.
pub fn centered_dtw_distance(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let (distance, _) = fast_dtw(&centered_points(a), &centered_points(b), 1);
    distance.is_finite().then_some(distance)
}
