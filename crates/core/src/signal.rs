//! Signal conditioning and extremum detection for rep segmentation.
//!
//! Three steps, applied to a gap-free segment in this order:
//!
//! 1. [`hampel_filter`] replaces single-sample detector glitches with the
//!    local median (running median + MAD, robust to outliers).
//! 2. [`moving_average`] low-pass filters the remaining jitter.
//! 3. [`find_valleys`] locates local minima that clear a prominence bar and
//!    keeps the most prominent one within any minimum-separation window.

/// Scale factor converting MAD to sigma for Gaussian noise.
const MAD_SCALE: f64 = 1.4826;

/// Below this, a window's MAD (and a sample's deviation) counts as zero.
const FLAT_WINDOW_EPSILON: f64 = 1e-12;

// ---------------------------------------------------------------------------
// Hampel despike
// ---------------------------------------------------------------------------

/// Hampel filter parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HampelConfig {
    /// Samples on each side of the centre (window = 2 * half_window + 1).
    pub half_window: usize,
    /// Outlier threshold in units of estimated sigma.
    pub threshold: f64,
}

impl Default for HampelConfig {
    fn default() -> Self {
        Self {
            half_window: 2,
            threshold: 3.0,
        }
    }
}

/// Replace samples deviating from the local median by more than
/// `threshold * sigma` with that median.
///
/// When the window's MAD is zero, any sample that differs from the median
/// is an outlier. A zero half-window returns the input unchanged.
pub fn hampel_filter(signal: &[f64], config: &HampelConfig) -> Vec<f64> {
    let n = signal.len();
    let mut filtered = signal.to_vec();
    if config.half_window == 0 {
        return filtered;
    }

    for i in 0..n {
        let start = i.saturating_sub(config.half_window);
        let end = (i + config.half_window + 1).min(n);
        let window = &signal[start..end];

        let med = median(window);
        let sigma = MAD_SCALE * median_absolute_deviation(window, med);
        let deviation = (signal[i] - med).abs();
        let is_outlier = if sigma > FLAT_WINDOW_EPSILON {
            deviation > config.threshold * sigma
        } else {
            deviation > FLAT_WINDOW_EPSILON
        };
        if is_outlier {
            filtered[i] = med;
        }
    }
    filtered
}

fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn median_absolute_deviation(data: &[f64], med: f64) -> f64 {
    let deviations: Vec<f64> = data.iter().map(|x| (x - med).abs()).collect();
    median(&deviations)
}

// ---------------------------------------------------------------------------
// Moving average
// ---------------------------------------------------------------------------

/// Round a window length up to the next odd number (minimum 1).
pub fn odd_window(samples: usize) -> usize {
    if samples <= 1 {
        1
    } else if samples % 2 == 0 {
        samples + 1
    } else {
        samples
    }
}

/// Centred moving average. Near the edges the window shrinks to the samples
/// available, so the output has the same length as the input.
pub fn moving_average(signal: &[f64], window: usize) -> Vec<f64> {
    let half = odd_window(window) / 2;
    let n = signal.len();
    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(n);
            let slice = &signal[start..end];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Extremum detection
// ---------------------------------------------------------------------------

/// A detected local extremum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    pub index: usize,
    pub value: f64,
    pub prominence: f64,
}

/// Local maxima of `signal` with at least `min_prominence`, no two closer
/// than `min_separation` samples.
///
/// A flat-topped peak is reported at the first sample of its plateau.
/// Endpoints are never peaks. When candidates compete for the same
/// separation window, higher prominence wins; on exact ties the earlier
/// index wins. Output is sorted by index.
pub fn find_peaks(signal: &[f64], min_prominence: f64, min_separation: usize) -> Vec<Extremum> {
    let mut candidates: Vec<Extremum> = local_maxima(signal)
        .into_iter()
        .map(|index| Extremum {
            index,
            value: signal[index],
            prominence: prominence(signal, index),
        })
        .filter(|e| e.prominence >= min_prominence)
        .collect();

    candidates.sort_by(|a, b| {
        b.prominence
            .total_cmp(&a.prominence)
            .then(a.index.cmp(&b.index))
    });

    let mut accepted: Vec<Extremum> = Vec::new();
    for candidate in candidates {
        let crowded = accepted
            .iter()
            .any(|kept| kept.index.abs_diff(candidate.index) < min_separation);
        if !crowded {
            accepted.push(candidate);
        }
    }

    accepted.sort_by_key(|e| e.index);
    accepted
}

/// Local minima, with the same rules as [`find_peaks`]. Reported values are
/// in the original (not negated) units.
pub fn find_valleys(signal: &[f64], min_prominence: f64, min_separation: usize) -> Vec<Extremum> {
    let negated: Vec<f64> = signal.iter().map(|v| -v).collect();
    find_peaks(&negated, min_prominence, min_separation)
        .into_iter()
        .map(|e| Extremum {
            value: signal[e.index],
            ..e
        })
        .collect()
}

/// Indices of interior local maxima, plateaus reported at their first sample.
fn local_maxima(signal: &[f64]) -> Vec<usize> {
    let n = signal.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }

    let mut i = 1;
    while i < n - 1 {
        if signal[i] > signal[i - 1] {
            // Walk across a possible plateau.
            let mut ahead = i + 1;
            while ahead < n - 1 && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                peaks.push(i);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

/// Topographic prominence of the peak at `peak`: height above the higher
/// of the two lowest points reached before climbing to higher ground (or
/// the signal edge) on either side.
fn prominence(signal: &[f64], peak: usize) -> f64 {
    let height = signal[peak];

    let mut left_min = height;
    for &v in signal[..peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &signal[peak + 1..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
