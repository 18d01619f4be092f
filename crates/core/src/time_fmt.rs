// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Time formatting helpers shared by the logs and the run summary.

use std::time::Duration;

/// Current UTC time as `2026-01-30T08:14:09Z`.
pub fn format_utc_now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Format elapsed seconds as a compact human string (`45s`, `3m`, `2h5m`, `4d`).
pub fn format_elapsed(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        let h = secs / 3600;
        let m = (secs % 3600) / 60;
        if m == 0 {
            format!("{}h", h)
        } else {
            format!("{}h{}m", h, m)
        }
    } else {
        format!("{}d", secs / 86400)
    }
}

/// Format a duration with millisecond precision below one minute (`1.25s`).
pub fn format_duration(d: Duration) -> String {
    if d.as_secs() < 60 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        format_elapsed(d.as_secs())
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
