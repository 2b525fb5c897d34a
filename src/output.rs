//! Notification rendering for the command-line host.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::events::{Event, EventDetail, EventKind};

/// Formats notifications as colored text or JSON lines
pub struct Output {
    format: OutputFormat,
    verbosity: VerbosityLevel,
    show_colors: bool,
}

const TOKEN_FIELD: &str = "authenticity_token";
const REDACTED: &str = "[redacted]";

#[derive(Serialize)]
struct EventRecord {
    event: &'static str,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "is_none_detail")]
    detail: EventDetail,
}

fn is_none_detail(detail: &EventDetail) -> bool {
    matches!(detail, EventDetail::None)
}

/// Copy of `detail` with the CSRF token masked.
fn redacted(detail: &EventDetail) -> EventDetail {
    match detail {
        EventDetail::Send { body } if body.get(TOKEN_FIELD).is_some() => {
            let mut body = body.clone();
            body.set(TOKEN_FIELD, REDACTED);
            EventDetail::Send { body }
        }
        other => other.clone(),
    }
}

impl Output {
    pub fn new(format: OutputFormat, verbosity: VerbosityLevel) -> Self {
        Self {
            format,
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    pub fn with_colors(mut self, show_colors: bool) -> Self {
        self.show_colors = show_colors;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    /// Whether `kind` is shown at the configured verbosity.
    pub fn shows(&self, kind: EventKind) -> bool {
        match self.verbosity {
            VerbosityLevel::Quiet => kind == EventKind::Error,
            VerbosityLevel::Normal => matches!(kind, EventKind::Success | EventKind::Error),
            VerbosityLevel::Verbose => true,
        }
    }

    /// Render `event`, or `None` if it is filtered out.
    pub fn format_event(&self, event: &Event) -> Option<String> {
        if !self.shows(event.kind()) {
            return None;
        }
        match self.format {
            OutputFormat::Human => Some(self.format_human(event)),
            OutputFormat::Json => Some(self.format_json(event, Utc::now())),
        }
    }

    fn format_human(&self, event: &Event) -> String {
        match event.detail() {
            EventDetail::Success { warning: None } => self.colorize("✓ VALID", "32"),
            EventDetail::Success {
                warning: Some(warning),
            } => format!("{}  {}", self.colorize("⚠ WARNING", "33"), warning),
            EventDetail::Error { message: None } => self.colorize("✗ INVALID", "31"),
            EventDetail::Error {
                message: Some(message),
            } => format!("{}  {}", self.colorize("✗ INVALID", "31"), message),
            EventDetail::Send { body } => {
                let value = body.get("value").unwrap_or_default();
                format!("{}  {:?}", self.colorize("→ send", "36"), value)
            }
            EventDetail::None => self.colorize(&format!("· {}", event.name()), "90"),
        }
    }

    fn format_json(&self, event: &Event, timestamp: DateTime<Utc>) -> String {
        let record = EventRecord {
            event: event.name(),
            timestamp,
            detail: redacted(event.detail()),
        };
        serde_json::to_string(&record).unwrap_or_else(|error| {
            format!(
                "{{\"event\":\"{}\",\"error\":\"{}\"}}",
                event.name(),
                error
            )
        })
    }
}
