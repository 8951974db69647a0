use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RumshopError};
use crate::ids::{SpanContext, SpanId, TraceFlags, TraceId};
use crate::model::attr::{AttrValue, Attributes};

/// Severity with OTLP severity numbers as discriminants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info = 9,
    Error = 17,
}

impl Severity {
    pub fn number(self) -> i32 {
        self as i32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = RumshopError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "INFO" => Ok(Self::Info),
            "ERROR" => Ok(Self::Error),
            _ => Err(RumshopError::Parse(format!("unknown severity: {s}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogData {
    pub scope: String,
    pub ts: DateTime<Utc>,
    pub severity: Severity,
    pub body: String,
    pub trace_id: Option<TraceId>,
    pub span_id: Option<SpanId>,
    pub trace_flags: TraceFlags,
    pub attributes: Attributes,
}

impl LogData {
    pub fn new(body: impl Into<String>, severity: Severity) -> Self {
        Self {
            scope: String::new(),
            ts: Utc::now(),
            severity,
            body: body.into(),
            trace_id: None,
            span_id: None,
            trace_flags: TraceFlags::default(),
            attributes: Attributes::new(),
        }
    }

    /// Copies the identifiers verbatim so a backend can join the log to the
    /// span it was emitted under.
    pub fn with_correlation(mut self, ctx: SpanContext) -> Self {
        self.trace_id = Some(ctx.trace_id);
        self.span_id = Some(ctx.span_id);
        self.trace_flags = ctx.trace_flags;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_parse_and_numbers() {
        assert_eq!(Severity::from_str("error").unwrap(), Severity::Error);
        assert_eq!(Severity::Info.number(), 9);
        assert_eq!(Severity::Error.number(), 17);
        assert!(Severity::from_str("wat").is_err());
    }

    #[test]
    fn correlation_is_copied() {
        let ctx = SpanContext::new(TraceId::random(), SpanId::random(), TraceFlags::SAMPLED);
        let log = LogData::new("page loaded", Severity::Info).with_correlation(ctx);
        assert_eq!(log.trace_id, Some(ctx.trace_id));
        assert_eq!(log.span_id, Some(ctx.span_id));
        assert!(log.trace_flags.is_sampled());
    }
}
