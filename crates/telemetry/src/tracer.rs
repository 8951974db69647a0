use std::any::type_name;
use std::error::Error;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rumshop_core::error::{Result, RumshopError};
use rumshop_core::ids::{SpanContext, SpanId, TraceFlags, TraceId};
use rumshop_core::model::attr::{AttrValue, Attributes};
use rumshop_core::model::span::{SpanData, SpanEvent, SpanKind, SpanStatus};

use crate::processor::Processor;

/// Creates spans for one instrumentation scope.
#[derive(Clone)]
pub struct Tracer {
    scope: Arc<str>,
    processor: Processor,
}

impl Tracer {
    pub(crate) fn new(scope: &str, processor: Processor) -> Self {
        Self {
            scope: Arc::from(scope),
            processor,
        }
    }

    /// Starts a root internal span.
    pub fn start(&self, name: impl Into<String>) -> Span {
        self.span_builder(name).start()
    }

    pub fn span_builder(&self, name: impl Into<String>) -> SpanBuilder<'_> {
        SpanBuilder {
            tracer: self,
            name: name.into(),
            kind: SpanKind::Internal,
            parent: None,
            attributes: Attributes::new(),
            start_ts: None,
        }
    }
}

pub struct SpanBuilder<'a> {
    tracer: &'a Tracer,
    name: String,
    kind: SpanKind,
    parent: Option<SpanContext>,
    attributes: Attributes,
    start_ts: Option<DateTime<Utc>>,
}

impl SpanBuilder<'_> {
    pub fn with_parent(mut self, parent: SpanContext) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Convenience for an optional extracted context.
    pub fn with_optional_parent(mut self, parent: Option<SpanContext>) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    pub fn with_start_time(mut self, ts: DateTime<Utc>) -> Self {
        self.start_ts = Some(ts);
        self
    }

    pub fn start(self) -> Span {
        let (trace_id, trace_flags, parent_span_id) = match self.parent {
            Some(parent) => (parent.trace_id, parent.trace_flags, Some(parent.span_id)),
            None => (TraceId::random(), TraceFlags::SAMPLED, None),
        };
        let context = SpanContext::new(trace_id, SpanId::random(), trace_flags);
        let start_ts = self.start_ts.unwrap_or_else(Utc::now);

        Span {
            context,
            data: Some(SpanData {
                scope: self.tracer.scope.to_string(),
                name: self.name,
                kind: self.kind,
                context,
                parent_span_id,
                start_ts,
                end_ts: start_ts,
                attributes: self.attributes,
                events: Vec::new(),
                status: SpanStatus::Unset,
            }),
            processor: self.tracer.processor.clone(),
        }
    }
}

/// An open span. Mutations are accepted until `end`; the span is handed to
/// the processor exactly once, on `end` or on drop.
pub struct Span {
    context: SpanContext,
    data: Option<SpanData>,
    processor: Processor,
}

impl Span {
    pub fn context(&self) -> SpanContext {
        self.context
    }

    pub fn is_recording(&self) -> bool {
        self.data.is_some()
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        if let Some(data) = self.data.as_mut() {
            data.attributes.insert(key, value);
        }
    }

    pub fn add_event(&mut self, name: impl Into<String>, attributes: Attributes) {
        if let Some(data) = self.data.as_mut() {
            data.events.push(SpanEvent {
                name: name.into(),
                ts: Utc::now(),
                attributes,
            });
        }
    }

    /// Adds an `exception` event. Does not touch the status.
    pub fn record_error<E: Error + ?Sized>(&mut self, err: &E) {
        let attributes = Attributes::new()
            .with("exception.type", short_type_name::<E>())
            .with("exception.message", err.to_string());
        self.add_event("exception", attributes);
    }

    pub fn set_status(&mut self, status: SpanStatus) -> Result<()> {
        match self.data.as_mut() {
            Some(data) => {
                data.status = status;
                Ok(())
            }
            None => Err(RumshopError::SpanEnded(format!(
                "cannot set status on ended span {}",
                self.context.span_id
            ))),
        }
    }

    pub fn end(&mut self) {
        self.end_at(Utc::now());
    }

    /// End time is clamped to the start time. Later calls are no-ops.
    pub fn end_at(&mut self, ts: DateTime<Utc>) {
        let Some(mut data) = self.data.take() else {
            return;
        };
        data.end_ts = ts.max(data.start_ts);
        if self.context.is_sampled() {
            self.processor.submit_span(data);
        }
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        self.end();
    }
}

fn short_type_name<E: ?Sized>() -> &'static str {
    let full = type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
