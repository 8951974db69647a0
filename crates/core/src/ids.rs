use std::fmt;

use crate::error::{Result, RumshopError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId([u8; 16]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId([u8; 8]);

impl TraceId {
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    pub fn parse(input: &str) -> Result<Self> {
        let bytes = parse_hex::<16>(input)
            .ok_or_else(|| RumshopError::Parse(format!("invalid trace id: {input}")))?;
        if bytes == [0; 16] {
            return Err(RumshopError::Parse(format!("invalid trace id: {input}")));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl SpanId {
    // The low half of a v4 uuid carries the variant bits, so it is never zero.
    pub fn random() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&uuid.as_bytes()[8..]);
        Self(bytes)
    }

    pub fn parse(input: &str) -> Result<Self> {
        let bytes = parse_hex::<8>(input)
            .ok_or_else(|| RumshopError::Parse(format!("invalid span id: {input}")))?;
        if bytes == [0; 8] {
            return Err(RumshopError::Parse(format!("invalid span id: {input}")));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn parse_hex<const N: usize>(input: &str) -> Option<[u8; N]> {
    if input.len() != N * 2 {
        return None;
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(input, &mut out).ok()?;
    Some(out)
}

/// W3C trace flags. Only the sampled bit is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TraceFlags(u8);

impl TraceFlags {
    pub const NOT_SAMPLED: TraceFlags = TraceFlags(0x00);
    pub const SAMPLED: TraceFlags = TraceFlags(0x01);

    pub fn new(bits: u8) -> Self {
        Self(bits)
    }

    pub fn is_sampled(self) -> bool {
        self.0 & Self::SAMPLED.0 == Self::SAMPLED.0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

/// Identifiers that travel with a span: what logs copy and what the
/// propagator writes into `traceparent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub trace_flags: TraceFlags,
    pub is_remote: bool,
}

impl SpanContext {
    pub fn new(trace_id: TraceId, span_id: SpanId, trace_flags: TraceFlags) -> Self {
        Self {
            trace_id,
            span_id,
            trace_flags,
            is_remote: false,
        }
    }

    pub fn remote(trace_id: TraceId, span_id: SpanId, trace_flags: TraceFlags) -> Self {
        Self {
            trace_id,
            span_id,
            trace_flags,
            is_remote: true,
        }
    }

    pub fn is_sampled(&self) -> bool {
        self.trace_flags.is_sampled()
    }
}
