use rumshop_core::config::Config;
use rumshop_core::error::{Result, RumshopError};
use rumshop_core::model::resource::Resource;

use crate::export::{Compression, Exporter, MemoryExporter, OtlpHttpExporter};
use crate::logger::Logger;
use crate::processor::{ExportMode, Processor, ProcessorConfig};
use crate::tracer::Tracer;

/// Process-wide telemetry pipeline: one resource, one processor, any number
/// of tracers and loggers. Cheap to clone.
#[derive(Clone)]
pub struct Telemetry {
    resource: Resource,
    processor: Processor,
}

impl Telemetry {
    pub fn new(resource: Resource, exporters: Vec<Exporter>, cfg: ProcessorConfig) -> Self {
        let processor = Processor::new(resource.clone(), exporters, cfg);
        Self {
            resource,
            processor,
        }
    }

    /// OTLP/HTTP to `collector_url`, plus the console exporter when enabled.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let collector = cfg.collector_url.trim();
        if !(collector.starts_with("http://") || collector.starts_with("https://")) {
            return Err(RumshopError::Config(format!(
                "collector url must be http(s): {collector}"
            )));
        }

        let mut exporters = vec![Exporter::OtlpHttp(OtlpHttpExporter::new(
            collector,
            &cfg.export.headers,
            Compression::parse(&cfg.export.compression),
            cfg.export.timeout,
        ))];
        if cfg.export.console {
            exporters.push(Exporter::Console);
        }

        let processor_cfg = ProcessorConfig {
            mode: ExportMode::parse(&cfg.export.mode),
            queue_capacity: cfg.export.queue_capacity,
            batch_size: cfg.export.batch_size,
            flush_interval: cfg.export.flush_interval,
        };
        tracing::debug!(
            collector,
            mode = ?processor_cfg.mode,
            console = cfg.export.console,
            "telemetry pipeline configured"
        );
        Ok(Self::new(cfg.resource(), exporters, processor_cfg))
    }

    /// Simple-mode pipeline that only records into memory.
    pub fn in_memory(resource: Resource) -> (Self, MemoryExporter) {
        let memory = MemoryExporter::new();
        let telemetry = Self::new(
            resource,
            vec![Exporter::Memory(memory.clone())],
            ProcessorConfig {
                mode: ExportMode::Simple,
                ..ProcessorConfig::default()
            },
        );
        (telemetry, memory)
    }

    pub fn tracer(&self, scope: &str) -> Tracer {
        Tracer::new(scope, self.processor.clone())
    }

    pub fn logger(&self, scope: &str) -> Logger {
        Logger::new(scope, self.processor.clone())
    }

    pub async fn force_flush(&self) {
        self.processor.force_flush().await;
    }

    /// Flushes what is buffered. Items submitted afterwards by surviving
    /// clones are still accepted.
    pub async fn shutdown(self) {
        self.force_flush().await;
        tracing::debug!(service = %self.resource.service_name, "telemetry flushed on shutdown");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rumshop_core::model::log::Severity;
    use testkit::StubCollector;

    use super::*;

    #[tokio::test]
    async fn from_config_rejects_non_http_collector() {
        let cfg = Config {
            collector_url: "localhost:4318".to_string(),
            ..Config::default()
        };
        let err = Telemetry::from_config(&cfg).err().unwrap();
        assert!(matches!(err, RumshopError::Config(_)));
    }

    #[tokio::test]
    async fn from_config_delivers_spans_and_logs_to_collector() {
        let collector = StubCollector::start().await.unwrap();
        let mut cfg = Config {
            collector_url: collector.url(),
            ..Config::default()
        };
        cfg.export.flush_interval = Duration::from_millis(20);

        let telemetry = Telemetry::from_config(&cfg).unwrap();
        let mut span = telemetry.tracer("rumshop.test").start("checkout");
        telemetry
            .logger("rumshop.test")
            .emit("pagamento aprovado", Severity::Info, Some(span.context()));
        span.end();
        telemetry.shutdown().await;

        let spans = collector.wait_for_spans(1, Duration::from_secs(2)).await;
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "checkout");
        let logs = collector.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].trace_id, spans[0].trace_id);

        let resource = collector.trace_requests()[0].resource_spans[0]
            .resource
            .clone()
            .unwrap();
        assert!(
            resource
                .attributes
                .iter()
                .any(|kv| kv.key == "service.name")
        );
    }
}
