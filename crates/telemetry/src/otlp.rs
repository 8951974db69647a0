use std::collections::BTreeMap;

use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::any_value::Value;
use opentelemetry_proto::tonic::common::v1::{AnyValue, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::logs::v1::{LogRecord as OtlpLogRecord, ResourceLogs, ScopeLogs};
use opentelemetry_proto::tonic::resource::v1::Resource as OtlpResource;
use opentelemetry_proto::tonic::trace::v1::span::{Event, SpanKind as OtlpSpanKind};
use opentelemetry_proto::tonic::trace::v1::status::StatusCode;
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Span as OtlpSpan, Status};
use rumshop_core::model::attr::{AttrValue, Attributes};
use rumshop_core::model::log::LogData;
use rumshop_core::model::resource::Resource;
use rumshop_core::model::span::{SpanData, SpanKind, SpanStatus};
use rumshop_core::time::unix_nanos;

pub fn encode_spans(resource: &Resource, spans: &[SpanData]) -> ExportTraceServiceRequest {
    let mut by_scope: BTreeMap<&str, Vec<OtlpSpan>> = BTreeMap::new();
    for span in spans {
        by_scope
            .entry(span.scope.as_str())
            .or_default()
            .push(encode_span(span));
    }

    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource: Some(encode_resource(resource)),
            scope_spans: by_scope
                .into_iter()
                .map(|(scope, spans)| ScopeSpans {
                    scope: Some(encode_scope(scope)),
                    spans,
                    schema_url: String::new(),
                })
                .collect(),
            schema_url: String::new(),
        }],
    }
}

pub fn encode_logs(resource: &Resource, logs: &[LogData]) -> ExportLogsServiceRequest {
    let mut by_scope: BTreeMap<&str, Vec<OtlpLogRecord>> = BTreeMap::new();
    for log in logs {
        by_scope
            .entry(log.scope.as_str())
            .or_default()
            .push(encode_log(log));
    }

    ExportLogsServiceRequest {
        resource_logs: vec![ResourceLogs {
            resource: Some(encode_resource(resource)),
            scope_logs: by_scope
                .into_iter()
                .map(|(scope, log_records)| ScopeLogs {
                    scope: Some(encode_scope(scope)),
                    log_records,
                    schema_url: String::new(),
                })
                .collect(),
            schema_url: String::new(),
        }],
    }
}

fn encode_span(span: &SpanData) -> OtlpSpan {
    let kind = match span.kind {
        SpanKind::Internal => OtlpSpanKind::Internal,
        SpanKind::Server => OtlpSpanKind::Server,
        SpanKind::Client => OtlpSpanKind::Client,
    };

    let status = match &span.status {
        SpanStatus::Unset => Status {
            message: String::new(),
            code: StatusCode::Unset as i32,
        },
        SpanStatus::Ok => Status {
            message: String::new(),
            code: StatusCode::Ok as i32,
        },
        SpanStatus::Error { message } => Status {
            message: message.clone().unwrap_or_default(),
            code: StatusCode::Error as i32,
        },
    };

    OtlpSpan {
        trace_id: span.context.trace_id.as_bytes().to_vec(),
        span_id: span.context.span_id.as_bytes().to_vec(),
        parent_span_id: span
            .parent_span_id
            .map(|id| id.as_bytes().to_vec())
            .unwrap_or_default(),
        flags: u32::from(span.context.trace_flags.bits()),
        name: span.name.clone(),
        kind: kind as i32,
        start_time_unix_nano: unix_nanos(span.start_ts),
        end_time_unix_nano: unix_nanos(span.end_ts),
        attributes: encode_attrs(&span.attributes),
        events: span
            .events
            .iter()
            .map(|e| Event {
                time_unix_nano: unix_nanos(e.ts),
                name: e.name.clone(),
                attributes: encode_attrs(&e.attributes),
                dropped_attributes_count: 0,
            })
            .collect(),
        status: Some(status),
        ..Default::default()
    }
}

fn encode_log(log: &LogData) -> OtlpLogRecord {
    OtlpLogRecord {
        time_unix_nano: unix_nanos(log.ts),
        observed_time_unix_nano: unix_nanos(log.ts),
        severity_number: log.severity.number(),
        severity_text: log.severity.as_str().to_string(),
        body: Some(string_value(&log.body)),
        attributes: encode_attrs(&log.attributes),
        flags: u32::from(log.trace_flags.bits()),
        trace_id: log
            .trace_id
            .map(|id| id.as_bytes().to_vec())
            .unwrap_or_default(),
        span_id: log
            .span_id
            .map(|id| id.as_bytes().to_vec())
            .unwrap_or_default(),
        ..Default::default()
    }
}

fn encode_resource(resource: &Resource) -> OtlpResource {
    OtlpResource {
        attributes: encode_attrs(&resource.attributes()),
        ..Default::default()
    }
}

fn encode_scope(name: &str) -> InstrumentationScope {
    InstrumentationScope {
        name: name.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ..Default::default()
    }
}

fn encode_attrs(attrs: &Attributes) -> Vec<KeyValue> {
    attrs
        .iter()
        .map(|(k, v)| KeyValue {
            key: k.to_string(),
            value: Some(encode_value(v)),
        })
        .collect()
}

fn encode_value(value: &AttrValue) -> AnyValue {
    let value = match value {
        AttrValue::Bool(v) => Value::BoolValue(*v),
        AttrValue::Int(v) => Value::IntValue(*v),
        AttrValue::Double(v) => Value::DoubleValue(*v),
        AttrValue::String(v) => Value::StringValue(v.clone()),
    };
    AnyValue { value: Some(value) }
}

fn string_value(s: &str) -> AnyValue {
    AnyValue {
        value: Some(Value::StringValue(s.to_string())),
    }
}
