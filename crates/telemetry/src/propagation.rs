//! W3C Trace Context (`traceparent`) injection and extraction.

use rumshop_core::ids::{SpanContext, SpanId, TraceFlags, TraceId};

pub const TRACEPARENT_HEADER: &str = "traceparent";

pub fn format_traceparent(ctx: &SpanContext) -> String {
    format!(
        "00-{}-{}-{:02x}",
        ctx.trace_id,
        ctx.span_id,
        ctx.trace_flags.bits()
    )
}

/// Returns `None` for anything that is not a valid header; callers then
/// start a root span.
pub fn parse_traceparent(value: &str) -> Option<SpanContext> {
    let value = value.trim();
    let mut parts = value.split('-');
    let version = parts.next()?;
    let trace_id = parts.next()?;
    let span_id = parts.next()?;
    let flags = parts.next()?;

    if version.len() != 2 || !is_lower_hex(version) || version == "ff" {
        return None;
    }
    // Version 00 has exactly four fields; later versions may append more.
    if version == "00" && parts.next().is_some() {
        return None;
    }
    if !is_lower_hex(trace_id) || !is_lower_hex(span_id) {
        return None;
    }
    if flags.len() != 2 || !is_lower_hex(flags) {
        return None;
    }

    let trace_id = TraceId::parse(trace_id).ok()?;
    let span_id = SpanId::parse(span_id).ok()?;
    let flags = u8::from_str_radix(flags, 16).ok()?;
    Some(SpanContext::remote(trace_id, span_id, TraceFlags::new(flags)))
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
