use std::sync::Arc;

use rumshop_core::ids::SpanContext;
use rumshop_core::model::log::{LogData, Severity};

use crate::processor::Processor;

/// Fire-and-forget log emitter. Nothing here blocks or fails the caller.
#[derive(Clone)]
pub struct Logger {
    scope: Arc<str>,
    processor: Processor,
}

impl Logger {
    pub(crate) fn new(scope: &str, processor: Processor) -> Self {
        Self {
            scope: Arc::from(scope),
            processor,
        }
    }

    /// Correlation ids are copied verbatim from `correlation` when given.
    pub fn emit(&self, body: impl Into<String>, severity: Severity, correlation: Option<SpanContext>) {
        let mut record = LogData::new(body, severity);
        if let Some(ctx) = correlation {
            record = record.with_correlation(ctx);
        }
        self.emit_record(record);
    }

    pub fn emit_record(&self, mut record: LogData) {
        if record.scope.is_empty() {
            record.scope = self.scope.to_string();
        }
        self.processor.submit_log(record);
    }

    pub fn info(&self, body: impl Into<String>, correlation: Option<SpanContext>) {
        self.emit(body, Severity::Info, correlation);
    }

    pub fn error(&self, body: impl Into<String>, correlation: Option<SpanContext>) {
        self.emit(body, Severity::Error, correlation);
    }
}

#[cfg(test)]
mod tests {
    use rumshop_core::model::attr::AttrValue;
    use rumshop_core::model::resource::Resource;

    use super::*;
    use crate::Telemetry;

    #[tokio::test]
    async fn logs_inside_a_span_carry_its_ids() {
        let (telemetry, memory) =
            Telemetry::in_memory(Resource::new("rumshop-backend", "3.2.0", "test"));
        let tracer = telemetry.tracer("rumshop.test");
        let logger = telemetry.logger("rumshop.test");

        let mut span = tracer.start("checkout");
        let ctx = span.context();
        logger.info("pedido recebido", Some(ctx));
        span.set_attribute("order.id", 1i64);
        logger.error("falha no pagamento", Some(span.context()));
        span.end();

        telemetry.force_flush().await;
        let logs = memory.logs();
        assert_eq!(logs.len(), 2);
        for log in &logs {
            assert_eq!(log.trace_id, Some(ctx.trace_id));
            assert_eq!(log.span_id, Some(ctx.span_id));
            assert_eq!(log.trace_flags, ctx.trace_flags);
            assert_eq!(log.scope, "rumshop.test");
        }
        assert_eq!(logs[1].severity, Severity::Error);
    }

    #[tokio::test]
    async fn uncorrelated_log_has_no_ids() {
        let (telemetry, memory) =
            Telemetry::in_memory(Resource::new("rumshop-backend", "3.2.0", "test"));
        telemetry.logger("rumshop.cli").emit("boot", Severity::Info, None);

        telemetry.force_flush().await;
        let logs = memory.logs();
        assert!(logs[0].trace_id.is_none());
        assert!(logs[0].span_id.is_none());
    }

    #[tokio::test]
    async fn emit_record_keeps_attributes_and_explicit_scope() {
        let (telemetry, memory) =
            Telemetry::in_memory(Resource::new("rumshop-backend", "3.2.0", "test"));
        let mut record =
            LogData::new("pedido", Severity::Info).with_attribute("order.product", "Tenis");
        record.scope = "rumshop.custom".to_string();
        telemetry.logger("rumshop.test").emit_record(record);

        telemetry.force_flush().await;
        let log = &memory.logs()[0];
        assert_eq!(log.scope, "rumshop.custom");
        assert_eq!(
            log.attributes.get("order.product"),
            Some(&AttrValue::from("Tenis"))
        );
    }
}
