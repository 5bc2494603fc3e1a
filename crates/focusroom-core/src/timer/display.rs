//! Derived values for rendering a countdown.

/// Format whole seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_mmss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// 0.0 .. 100.0 progress within a phase of `total_ms`.
pub fn progress_pct(remaining_ms: u64, total_ms: u64) -> f64 {
    if total_ms == 0 {
        return 0.0;
    }
    let done = 1.0 - (remaining_ms as f64 / total_ms as f64);
    (done * 100.0).clamp(0.0, 100.0)
}
