//! Mapping of phase-local progress onto the overall 0-100 scale.

/// Upload phase, `fraction` in `0.0..=1.0`.
pub fn uploading(fraction: f64) -> f64 {
    scale(fraction, 0.0, 30.0)
}

/// Submission.
pub const SUBMITTED: f64 = 30.0;

/// Polling phase, `server_percent` in `0.0..=100.0`.
pub fn polling(server_percent: f64) -> f64 {
    scale(server_percent / 100.0, 30.0, 80.0)
}

/// Retrieval phase, by files present.
pub fn retrieving(present: usize, total: usize) -> f64 {
    let fraction = if total == 0 {
        1.0
    } else {
        present as f64 / total as f64
    };
    scale(fraction, 80.0, 95.0)
}

/// Result assembled.
pub const ASSEMBLED: f64 = 100.0;

fn scale(fraction: f64, from: f64, to: f64) -> f64 {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    from + (to - from) * fraction
}
