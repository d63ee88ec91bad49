//! Snapshot of a timer's slots and its textual rendering

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// How durations are rendered in a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationStyle {
    /// `H:MM:SS` with a `.ffffff` microsecond suffix when non-zero.
    #[default]
    Clock,
    /// Fractional seconds, e.g. `1.250000s`.
    Seconds,
}

/// Report rendering options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub duration_style: DurationStyle,
    /// Prefix written before each slot line.
    pub indent: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            duration_style: DurationStyle::Clock,
            indent: "  ".to_string(),
        }
    }
}

/// One slot line of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub name: String,
    #[serde(serialize_with = "as_secs")]
    pub elapsed: Duration,
    pub runs: usize,
    pub running: bool,
}

/// Frozen view of a timer, entries sorted by elapsed time, longest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    #[serde(serialize_with = "as_secs")]
    pub total: Duration,
    pub entries: Vec<ReportEntry>,
    #[serde(skip)]
    settings: ReportSettings,
}

impl Report {
    /// Build a report. Entries must be in slot creation order; the sort is
    /// stable so equal times keep that order.
    pub fn new(total: Duration, mut entries: Vec<ReportEntry>, settings: ReportSettings) -> Self {
        entries.sort_by(|a, b| b.elapsed.cmp(&a.elapsed));
        Self {
            total,
            entries,
            settings,
        }
    }

    pub fn entry(&self, name: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    fn duration(&self, duration: Duration) -> String {
        match self.settings.duration_style {
            DurationStyle::Clock => format_duration(duration),
            DurationStyle::Seconds => format!("{:.6}s", duration.as_secs_f64()),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Total elapsed: {}", self.duration(self.total))?;
        for entry in &self.entries {
            write!(
                f,
                "\n{}|- {}: {}",
                self.settings.indent,
                entry.name,
                self.duration(entry.elapsed)
            )?;
        }
        Ok(())
    }
}

/// Render a duration as `[D day(s), ]H:MM:SS[.ffffff]`.
///
/// Sub-microsecond precision is truncated.
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let micros = duration.subsec_micros();

    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    let mut out = String::new();
    if days > 0 {
        let unit = if days == 1 { "day" } else { "days" };
        out.push_str(&format!("{days} {unit}, "));
    }
    out.push_str(&format!("{hours}:{minutes:02}:{seconds:02}"));
    if micros > 0 {
        out.push_str(&format!(".{micros:06}"));
    }
    out
}

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}
