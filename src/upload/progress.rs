//! Throttled progress rendering
//!
//! Every chunk read from disk produces a progress tick. The local terminal
//! bar follows every tick; the remote status message is edited at most once
//! per interval for the same message, plus once more when the transfer
//! completes.

use crate::telegram::{ChatTransport, StatusMessage};
use byte_unit::Byte;
use dashmap::DashMap;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Segments in the rendered bar
const BAR_WIDTH: usize = 20;

/// What a running transfer reports into
pub struct ProgressContext {
    pub status: StatusMessage,
    pub total: u64,
    pub started: Instant,
    /// Prefix line, e.g. "Uploading <b>a.mkv</b> as VIDEO"
    pub label: String,
    pub bar: Option<ProgressBar>,
}

/// Numbers derived from one progress tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressStats {
    pub percentage: f64,
    /// Bytes per second
    pub speed: f64,
    pub remaining_secs: u64,
    pub estimated_total_secs: u64,
}

impl ProgressStats {
    pub fn compute(current: u64, total: u64, elapsed_secs: u64) -> Self {
        let percentage = if total > 0 {
            current as f64 * 100.0 / total as f64
        } else {
            0.0
        };

        let speed = if elapsed_secs > 0 {
            current as f64 / elapsed_secs as f64
        } else {
            0.0
        };

        let remaining_secs = if speed > 0.0 {
            (total.saturating_sub(current) as f64 / speed).round() as u64
        } else {
            0
        };

        ProgressStats {
            percentage,
            speed,
            remaining_secs,
            estimated_total_secs: elapsed_secs + remaining_secs,
        }
    }
}

/// Human readable size, binary units
pub fn human_bytes(bytes: u64) -> String {
    Byte::from_bytes(bytes.into())
        .get_appropriate_unit(true)
        .to_string()
}

/// Human readable duration; empty for zero
pub fn format_duration(secs: u64) -> String {
    if secs == 0 {
        return String::new();
    }
    humantime::format_duration(Duration::from_secs(secs)).to_string()
}

/// Percentage rounded to two places, keeping one decimal for whole numbers
pub fn format_percentage(percentage: f64) -> String {
    let rounded = (percentage * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        rounded.to_string()
    }
}

/// Body of the status message for one tick
pub fn render_progress(current: u64, total: u64, elapsed_secs: u64) -> String {
    let stats = ProgressStats::compute(current, total, elapsed_secs);

    let filled = ((stats.percentage / 5.0).floor() as usize).min(BAR_WIDTH);
    let eta = format_duration(stats.remaining_secs);

    format!(
        "[{}{}] \nP: {}%\n{} of {}\nSpeed: {}/s\nETA: {}\n",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        format_percentage(stats.percentage),
        human_bytes(current),
        human_bytes(total),
        human_bytes(stats.speed as u64),
        if eta.is_empty() { "0 seconds" } else { eta.as_str() },
    )
}

/// Terminal progress bar for one file
pub fn console_bar(total: u64, file_name: &str) -> ProgressBar {
    let style = ProgressStyle::with_template(
        "{msg} {bar:40.green/white} {bytes}/{total_bytes} {bytes_per_sec} {eta}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());

    let short: String = file_name.chars().take(20).collect();
    let bar = ProgressBar::new(total);
    bar.set_style(style);
    bar.set_message(format!("Uploading {}", short));
    bar
}

/// Renders progress, keeping the last edit time per status message
pub struct ProgressRenderer {
    interval: Duration,
    last_update: DashMap<StatusMessage, Instant>,
}

impl ProgressRenderer {
    pub fn new(interval: Duration) -> Self {
        ProgressRenderer {
            interval,
            last_update: DashMap::new(),
        }
    }

    /// Handle one progress tick
    pub async fn report<T: ChatTransport + ?Sized>(
        &self,
        transport: &T,
        ctx: &ProgressContext,
        current: u64,
    ) {
        self.report_at(transport, ctx, current, Instant::now()).await
    }

    async fn report_at<T: ChatTransport + ?Sized>(
        &self,
        transport: &T,
        ctx: &ProgressContext,
        current: u64,
        now: Instant,
    ) {
        let finished = current == ctx.total;

        if let Some(bar) = &ctx.bar {
            bar.set_position(current);
            if finished {
                bar.finish_with_message("uploaded");
            }
        }

        if !self.is_due(&ctx.status, finished, now) {
            return;
        }

        let elapsed = now.saturating_duration_since(ctx.started).as_secs_f64().round() as u64;
        if elapsed == 0 {
            return;
        }

        let text = format!("{}\n {}", ctx.label, render_progress(current, ctx.total, elapsed));

        if let Err(e) = transport.edit_status(&ctx.status, &text).await {
            match e.flood_wait() {
                Some(wait) => {
                    warn!("Flood wait while editing progress, sleeping {:?}", wait);
                    tokio::time::sleep(wait).await;
                }
                None => debug!("Progress edit failed: {}", e),
            }
        }
    }

    /// Claim the update slot for `status` if its window has passed
    fn is_due(&self, status: &StatusMessage, finished: bool, now: Instant) -> bool {
        let window_passed = self
            .last_update
            .get(status)
            .map(|last| now.saturating_duration_since(*last) > self.interval)
            .unwrap_or(true);

        if window_passed || finished {
            self.last_update.insert(*status, now);
            true
        } else {
            false
        }
    }
}
