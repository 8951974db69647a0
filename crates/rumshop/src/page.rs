//! The storefront page. A fixed document; the only dynamic parts are config
//! values, embedded as JSON string literals inside the module script.

use rumshop_core::config::Config;

pub const PAGE_TITLE: &str = "Loja RUM - Monitoramento Full";

/// Values interpolated into the page.
#[derive(Debug, Clone)]
pub struct PageConfig {
    pub collector_url: String,
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    pub export_mode: String,
}

impl PageConfig {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            collector_url: cfg.collector_url.clone(),
            service_name: cfg.rum_service_name.clone(),
            service_version: cfg.service_version.clone(),
            environment: cfg.environment.clone(),
            export_mode: cfg.export.mode.clone(),
        }
    }
}

/// Fills the template in one pass, so substituted values are never scanned
/// for placeholders again.
pub fn render(cfg: &PageConfig) -> String {
    let values = [
        ("__TITLE__", PAGE_TITLE.to_string()),
        ("__COLLECTOR_URL__", js_string(&cfg.collector_url)),
        ("__SERVICE_NAME__", js_string(&cfg.service_name)),
        ("__SERVICE_VERSION__", js_string(&cfg.service_version)),
        ("__ENVIRONMENT__", js_string(&cfg.environment)),
        ("__EXPORT_MODE__", js_string(&cfg.export_mode)),
    ];

    let mut out = String::with_capacity(TEMPLATE.len() + 256);
    let mut rest = TEMPLATE;
    while let Some(pos) = rest.find("__") {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match values.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push_str("__");
                rest = &tail[2..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// JSON string literal that is also safe inside a `<script>` element.
fn js_string(value: &str) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace("</", "<\\/")
}

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="pt-br">
<head>
  <meta charset="UTF-8">
  <title>__TITLE__</title>
  <script type="module">
    import { WebTracerProvider } from 'https://esm.sh/@opentelemetry/sdk-trace-web@1.30.1';
    import { SimpleSpanProcessor, BatchSpanProcessor, ConsoleSpanExporter } from 'https://esm.sh/@opentelemetry/sdk-trace-base@1.30.1';
    import { Resource } from 'https://esm.sh/@opentelemetry/resources@1.30.1';
    import { SemanticResourceAttributes } from 'https://esm.sh/@opentelemetry/semantic-conventions@1.28.0';
    import { OTLPTraceExporter } from 'https://esm.sh/@opentelemetry/exporter-trace-otlp-http@0.57.2';
    import { LoggerProvider, SimpleLogRecordProcessor, BatchLogRecordProcessor } from 'https://esm.sh/@opentelemetry/sdk-logs@0.57.2';
    import { OTLPLogExporter } from 'https://esm.sh/@opentelemetry/exporter-logs-otlp-http@0.57.2';
    import { SeverityNumber } from 'https://esm.sh/@opentelemetry/api-logs@0.57.2';
    import { trace, context, SpanStatusCode, SpanKind } from 'https://esm.sh/@opentelemetry/api@1.9.0';

    const COLLECTOR_URL = __COLLECTOR_URL__;
    const SERVICE_NAME = __SERVICE_NAME__;
    const SERVICE_VERSION = __SERVICE_VERSION__;
    const ENVIRONMENT = __ENVIRONMENT__;
    const EXPORT_MODE = __EXPORT_MODE__;

    console.log(`Iniciando RUM ${SERVICE_VERSION}`);

    try {
      const resource = new Resource({
        [SemanticResourceAttributes.SERVICE_NAME]: SERVICE_NAME,
        [SemanticResourceAttributes.SERVICE_VERSION]: SERVICE_VERSION,
        'deployment.environment': ENVIRONMENT,
        'deployment.type': 'cdn_loading',
      });
      const batched = EXPORT_MODE === 'batch';

      const tracerProvider = new WebTracerProvider({ resource });
      const traceExporter = new OTLPTraceExporter({ url: `${COLLECTOR_URL}/v1/traces` });
      tracerProvider.addSpanProcessor(batched ? new BatchSpanProcessor(traceExporter) : new SimpleSpanProcessor(traceExporter));
      tracerProvider.addSpanProcessor(new SimpleSpanProcessor(new ConsoleSpanExporter()));
      tracerProvider.register();
      const tracer = tracerProvider.getTracer('rumshop-rum');

      const rootSpan = tracer.startSpan('carregamento_pagina', { startTime: performance.timeOrigin });

      const loggerProvider = new LoggerProvider({ resource });
      const logExporter = new OTLPLogExporter({ url: `${COLLECTOR_URL}/v1/logs` });
      loggerProvider.addLogRecordProcessor(batched ? new BatchLogRecordProcessor(logExporter) : new SimpleLogRecordProcessor(logExporter));
      const logger = loggerProvider.getLogger('rumshop-rum-logger');

      window.logToCollector = (message, severity = 'INFO') => {
        const ctx = rootSpan.spanContext();
        logger.emit({
          body: message,
          severityNumber: severity === 'ERROR' ? SeverityNumber.ERROR : SeverityNumber.INFO,
          severityText: severity,
          timestamp: new Date(),
          traceId: ctx.traceId,
          spanId: ctx.spanId,
          traceFlags: 1,
          attributes: {
            'page.url': window.location.href,
            'user_agent': navigator.userAgent,
            'manual.trace_id': ctx.traceId,
          },
        });
      };

      const setStatus = (text) => {
        document.getElementById('status').textContent = text;
      };

      const tracedPost = async (spanName, path) => {
        const span = tracer.startSpan(spanName, { kind: SpanKind.CLIENT }, trace.setSpan(context.active(), rootSpan));
        const ctx = span.spanContext();
        const traceparent = `00-${ctx.traceId}-${ctx.spanId}-0${ctx.traceFlags & 1}`;
        try {
          const resp = await fetch(path, {
            method: 'POST',
            headers: { 'content-type': 'application/json', 'traceparent': traceparent },
            body: '{}',
          });
          const payload = await resp.json();
          span.setAttribute('http.status_code', resp.status);
          if (resp.ok) {
            span.setStatus({ code: SpanStatusCode.OK });
            window.logToCollector(`Compra concluida: pedido ${payload.id}`, 'INFO');
            setStatus(`Pedido ${payload.id} confirmado`);
          } else {
            span.setStatus({ code: SpanStatusCode.ERROR, message: payload.msg });
            window.logToCollector(`Falha na requisicao ${path}: ${payload.msg}`, 'ERROR');
            setStatus(`Erro: ${payload.msg}`);
          }
        } catch (e) {
          span.recordException(e);
          span.setStatus({ code: SpanStatusCode.ERROR, message: String(e) });
          window.logToCollector(`Falha de rede em ${path}: ${e}`, 'ERROR');
          setStatus('Erro de rede');
        } finally {
          span.end();
        }
      };

      document.getElementById('btn-comprar').addEventListener('click', () => tracedPost('clique_comprar', '/checkout'));
      document.getElementById('btn-erro').addEventListener('click', () => tracedPost('clique_erro', '/simular_erro'));

      window.addEventListener('load', () => {
        window.logToCollector('Pagina totalmente carregada', 'INFO');
        setTimeout(() => rootSpan.end(), 200);
      });

      window.addEventListener('error', (e) => {
        window.logToCollector(`Erro JS Global: ${e.message}`, 'ERROR');
      });
    } catch (e) {
      console.error('Erro na configuracao RUM:', e);
    }
  </script>
  <style>
    body { font-family: 'Segoe UI', sans-serif; display: flex; flex-direction: column; justify-content: center; align-items: center; height: 100vh; background-color: #f4f6f8; margin: 0; }
    .card { background: white; padding: 40px; border-radius: 12px; box-shadow: 0 4px 20px rgba(0,0,0,0.08); text-align: center; max-width: 450px; width: 100%; }
    h1 { color: #2d3e50; margin-bottom: 10px; font-size: 24px; }
    p { color: #6c757d; margin-bottom: 30px; }
    .btn-group { display: flex; gap: 15px; justify-content: center; }
    .btn { padding: 12px 24px; border: none; border-radius: 8px; cursor: pointer; font-size: 14px; font-weight: 600; }
    .btn-buy { background-color: #0066cc; color: white; }
    .btn-error { background-color: #d93025; color: white; }
    .status { margin-top: 20px; font-size: 12px; color: #888; }
  </style>
</head>
<body>
  <div class="card">
    <h1>Loja RUM</h1>
    <p>Cada clique gera um trace no navegador e outro no servidor, ligados pelo mesmo Trace ID.</p>
    <div class="btn-group">
      <button id="btn-comprar" class="btn btn-buy">Comprar</button>
      <button id="btn-erro" class="btn btn-error">Simular erro</button>
    </div>
    <div id="status" class="status">Verifique o console (F12) para ver os IDs</div>
  </div>
</body>
</html>
"##;
