use std::fmt;

use chrono::{DateTime, Utc};

use crate::ids::{SpanContext, SpanId};
use crate::model::attr::Attributes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanKind {
    #[default]
    Internal,
    Server,
    Client,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error { message: Option<String> },
}

impl SpanStatus {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanStatus::Unset => f.write_str("UNSET"),
            SpanStatus::Ok => f.write_str("OK"),
            SpanStatus::Error { .. } => f.write_str("ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpanEvent {
    pub name: String,
    pub ts: DateTime<Utc>,
    pub attributes: Attributes,
}

/// A finished span as handed to exporters.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanData {
    pub scope: String,
    pub name: String,
    pub kind: SpanKind,
    pub context: SpanContext,
    pub parent_span_id: Option<SpanId>,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub attributes: Attributes,
    pub events: Vec<SpanEvent>,
    pub status: SpanStatus,
}

impl SpanData {
    pub fn duration_ms(&self) -> i64 {
        (self.end_ts - self.start_ts).num_milliseconds().max(0)
    }
}
