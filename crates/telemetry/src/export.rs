use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flate2::Compression as GzLevel;
use flate2::write::GzEncoder;
use prost::Message;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rumshop_core::error::{Result, RumshopError};
use rumshop_core::model::log::LogData;
use rumshop_core::model::resource::Resource;
use rumshop_core::model::span::SpanData;

use crate::otlp::{encode_logs, encode_spans};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

impl Compression {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "gzip" => Self::Gzip,
            _ => Self::None,
        }
    }
}

/// Destination for finished telemetry. A processor fans out to every
/// configured exporter.
#[derive(Clone)]
pub enum Exporter {
    OtlpHttp(OtlpHttpExporter),
    Console,
    Memory(MemoryExporter),
}

impl Exporter {
    pub fn name(&self) -> &'static str {
        match self {
            Exporter::OtlpHttp(_) => "otlp_http",
            Exporter::Console => "console",
            Exporter::Memory(_) => "memory",
        }
    }

    pub async fn export_spans(&self, resource: &Resource, spans: &[SpanData]) -> Result<()> {
        match self {
            Exporter::OtlpHttp(exporter) => exporter.export_spans(resource, spans).await,
            Exporter::Console => {
                for span in spans {
                    tracing::info!(
                        target: "rumshop::console_export",
                        service = %resource.service_name,
                        trace_id = %span.context.trace_id,
                        span_id = %span.context.span_id,
                        parent_span_id = ?span.parent_span_id.map(|id| id.to_hex()),
                        duration_ms = span.duration_ms(),
                        status = %span.status,
                        attrs = %span.attributes.to_text(),
                        "span {}",
                        span.name
                    );
                }
                Ok(())
            }
            Exporter::Memory(exporter) => {
                exporter.push_spans(spans);
                Ok(())
            }
        }
    }

    pub async fn export_logs(&self, resource: &Resource, logs: &[LogData]) -> Result<()> {
        match self {
            Exporter::OtlpHttp(exporter) => exporter.export_logs(resource, logs).await,
            Exporter::Console => {
                for log in logs {
                    tracing::info!(
                        target: "rumshop::console_export",
                        service = %resource.service_name,
                        severity = %log.severity,
                        trace_id = ?log.trace_id.map(|id| id.to_hex()),
                        span_id = ?log.span_id.map(|id| id.to_hex()),
                        attrs = %log.attributes.to_text(),
                        "log {}",
                        log.body
                    );
                }
                Ok(())
            }
            Exporter::Memory(exporter) => {
                exporter.push_logs(logs);
                Ok(())
            }
        }
    }
}

/// OTLP/HTTP protobuf exporter. One attempt per payload; the caller drops
/// the payload on failure.
#[derive(Clone)]
pub struct OtlpHttpExporter {
    client: Client,
    traces_url: String,
    logs_url: String,
    headers: HeaderMap,
    compression: Compression,
}

impl OtlpHttpExporter {
    pub fn new(
        endpoint: &str,
        headers: &[(String, String)],
        compression: Compression,
        timeout: Duration,
    ) -> Self {
        let endpoint = endpoint.trim_end_matches('/');
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = ?e, "failed to build export http client; using defaults");
                Client::new()
            });

        Self {
            client,
            traces_url: format!("{endpoint}/v1/traces"),
            logs_url: format!("{endpoint}/v1/logs"),
            headers: build_http_headers(headers),
            compression,
        }
    }

    pub fn traces_url(&self) -> &str {
        &self.traces_url
    }

    pub fn logs_url(&self) -> &str {
        &self.logs_url
    }

    async fn export_spans(&self, resource: &Resource, spans: &[SpanData]) -> Result<()> {
        let body = encode_spans(resource, spans).encode_to_vec();
        self.post(&self.traces_url, body).await
    }

    async fn export_logs(&self, resource: &Resource, logs: &[LogData]) -> Result<()> {
        let body = encode_logs(resource, logs).encode_to_vec();
        self.post(&self.logs_url, body).await
    }

    async fn post(&self, url: &str, body: Vec<u8>) -> Result<()> {
        let (body, content_encoding) = maybe_compress_http_body(body, self.compression)
            .map_err(|e| RumshopError::Export(format!("failed to compress payload: {e}")))?;

        let mut req = self
            .client
            .post(url)
            .header("content-type", "application/x-protobuf")
            .headers(self.headers.clone());
        if let Some(encoding) = content_encoding {
            req = req.header("content-encoding", encoding);
        }

        let resp = req
            .body(body)
            .send()
            .await
            .map_err(|e| RumshopError::Export(format!("POST {url} failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(RumshopError::Export(format!(
                "POST {url} returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

/// Keeps everything it is handed, for tests and local inspection.
#[derive(Clone, Default)]
pub struct MemoryExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
    logs: Arc<Mutex<Vec<LogData>>>,
}

impl MemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> Vec<SpanData> {
        self.spans.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn logs(&self) -> Vec<LogData> {
        self.logs.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn push_spans(&self, spans: &[SpanData]) {
        if let Ok(mut slot) = self.spans.lock() {
            slot.extend_from_slice(spans);
        }
    }

    fn push_logs(&self, logs: &[LogData]) {
        if let Ok(mut slot) = self.logs.lock() {
            slot.extend_from_slice(logs);
        }
    }
}

fn build_http_headers(headers: &[(String, String)]) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (k, v) in headers {
        let name = HeaderName::try_from(k.as_str());
        let value = HeaderValue::try_from(v.as_str());
        match (name, value) {
            (Ok(name), Ok(value)) => {
                out.insert(name, value);
            }
            _ => {
                tracing::warn!(header = %k, "ignored invalid export HTTP header");
            }
        }
    }
    out
}

fn maybe_compress_http_body(
    body: Vec<u8>,
    compression: Compression,
) -> std::io::Result<(Vec<u8>, Option<&'static str>)> {
    match compression {
        Compression::None => Ok((body, None)),
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
            encoder.write_all(&body)?;
            let compressed = encoder.finish()?;
            Ok((compressed, Some("gzip")))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::GzDecoder;
    use rumshop_core::model::log::Severity;
    use testkit::StubCollector;

    use super::*;

    fn resource() -> Resource {
        Resource::new("rumshop-backend", "3.2.0", "test")
    }

    #[test]
    fn compression_parse_variants() {
        assert_eq!(Compression::parse("gzip"), Compression::Gzip);
        assert_eq!(Compression::parse("GZIP"), Compression::Gzip);
        assert_eq!(Compression::parse("none"), Compression::None);
        assert_eq!(Compression::parse("unexpected"), Compression::None);
    }

    #[test]
    fn gzip_body_roundtrips() {
        let (compressed, encoding) =
            maybe_compress_http_body(b"payload".to_vec(), Compression::Gzip).unwrap();
        assert_eq!(encoding, Some("gzip"));
        let mut out = String::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, "payload");
    }

    #[test]
    fn signal_urls_hang_off_the_collector_base() {
        let exporter = OtlpHttpExporter::new(
            "https://collector.example/",
            &[],
            Compression::None,
            Duration::from_secs(1),
        );
        assert_eq!(exporter.traces_url(), "https://collector.example/v1/traces");
        assert_eq!(exporter.logs_url(), "https://collector.example/v1/logs");
    }

    #[test]
    fn invalid_headers_are_skipped() {
        let headers = build_http_headers(&[
            ("x-tenant".to_string(), "dev".to_string()),
            ("bad header".to_string(), "x".to_string()),
        ]);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("x-tenant").unwrap(), "dev");
    }

    #[tokio::test]
    async fn otlp_http_delivers_logs_with_headers_and_gzip() {
        let collector = StubCollector::start().await.unwrap();
        let exporter = Exporter::OtlpHttp(OtlpHttpExporter::new(
            &collector.url(),
            &[("x-tenant".to_string(), "dev".to_string())],
            Compression::Gzip,
            Duration::from_secs(2),
        ));

        let mut log = LogData::new("pagamento aprovado", Severity::Info);
        log.scope = "rumshop.http".to_string();
        exporter.export_logs(&resource(), &[log]).await.unwrap();

        let logs = collector.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(testkit::body_text(&logs[0]), "pagamento aprovado");
        assert_eq!(collector.last_header("x-tenant").as_deref(), Some("dev"));
        assert_eq!(
            collector.last_header("content-encoding").as_deref(),
            Some("gzip")
        );
    }

    #[tokio::test]
    async fn otlp_http_reports_rejected_payloads() {
        let collector = StubCollector::start().await.unwrap();
        collector.set_failing(true);
        let exporter = Exporter::OtlpHttp(OtlpHttpExporter::new(
            &collector.url(),
            &[],
            Compression::None,
            Duration::from_secs(2),
        ));

        let err = exporter
            .export_logs(&resource(), &[LogData::new("x", Severity::Info)])
            .await
            .unwrap_err();
        assert!(matches!(err, RumshopError::Export(_)));
        assert!(collector.logs().is_empty());
    }

    #[tokio::test]
    async fn memory_exporter_accumulates() {
        let memory = MemoryExporter::new();
        let exporter = Exporter::Memory(memory.clone());
        exporter
            .export_logs(&resource(), &[LogData::new("a", Severity::Info)])
            .await
            .unwrap();
        exporter
            .export_logs(&resource(), &[LogData::new("b", Severity::Error)])
            .await
            .unwrap();
        let bodies: Vec<_> = memory.logs().into_iter().map(|l| l.body).collect();
        assert_eq!(bodies, vec!["a".to_string(), "b".to_string()]);
        assert!(memory.spans().is_empty());
    }
}
