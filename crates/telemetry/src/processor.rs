use std::time::Duration;

use rumshop_core::model::log::LogData;
use rumshop_core::model::resource::Resource;
use rumshop_core::model::span::SpanData;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::warn;

use crate::export::Exporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    /// Deliver each item as soon as it is handed over.
    Simple,
    /// Deliver when `batch_size` items are buffered or `flush_interval`
    /// elapses, whichever comes first.
    Batch,
}

impl ExportMode {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "simple" | "immediate" => Self::Simple,
            _ => Self::Batch,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub mode: ExportMode,
    pub queue_capacity: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            mode: ExportMode::Batch,
            queue_capacity: 2048,
            batch_size: 512,
            flush_interval: Duration::from_secs(1),
        }
    }
}

enum Command {
    Span(SpanData),
    Log(LogData),
    Flush(oneshot::Sender<()>),
}

/// Hands finished spans and logs to a background export task. Submitting
/// never blocks: when the queue is full the item is dropped.
#[derive(Clone)]
pub struct Processor {
    tx: mpsc::Sender<Command>,
}

// `tokio::time::interval` panics on a zero period.
const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

impl Processor {
    /// Must be called inside a Tokio runtime.
    pub fn new(resource: Resource, exporters: Vec<Exporter>, cfg: ProcessorConfig) -> Self {
        let (tx, rx) = mpsc::channel(cfg.queue_capacity.max(1));
        let worker = Worker {
            resource,
            exporters,
        };

        match cfg.mode {
            ExportMode::Simple => {
                tokio::spawn(run_simple(worker, rx));
            }
            ExportMode::Batch => {
                tokio::spawn(run_batch(
                    worker,
                    rx,
                    cfg.batch_size.max(1),
                    cfg.flush_interval.max(MIN_FLUSH_INTERVAL),
                ));
            }
        }

        Self { tx }
    }

    pub fn submit_span(&self, span: SpanData) {
        self.enqueue(Command::Span(span), "span");
    }

    pub fn submit_log(&self, log: LogData) {
        self.enqueue(Command::Log(log), "log");
    }

    /// Waits until everything submitted before this call has been handed to
    /// the exporters.
    pub async fn force_flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).await.is_err() {
            return;
        }
        let _ = done_rx.await;
    }

    fn enqueue(&self, cmd: Command, kind: &'static str) {
        match self.tx.try_send(cmd) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(kind, "telemetry dropped: export queue full");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(kind, "telemetry dropped: export task stopped");
            }
        }
    }
}

struct Worker {
    resource: Resource,
    exporters: Vec<Exporter>,
}

impl Worker {
    async fn flush_spans(&self, buffer: &mut Vec<SpanData>) {
        if buffer.is_empty() {
            return;
        }
        for exporter in &self.exporters {
            if let Err(e) = exporter.export_spans(&self.resource, buffer).await {
                warn!(
                    exporter = exporter.name(),
                    count = buffer.len(),
                    error = %e,
                    "span export failed; batch dropped"
                );
            }
        }
        buffer.clear();
    }

    async fn flush_logs(&self, buffer: &mut Vec<LogData>) {
        if buffer.is_empty() {
            return;
        }
        for exporter in &self.exporters {
            if let Err(e) = exporter.export_logs(&self.resource, buffer).await {
                warn!(
                    exporter = exporter.name(),
                    count = buffer.len(),
                    error = %e,
                    "log export failed; batch dropped"
                );
            }
        }
        buffer.clear();
    }
}

async fn run_simple(worker: Worker, mut rx: mpsc::Receiver<Command>) {
    let mut spans = Vec::with_capacity(1);
    let mut logs = Vec::with_capacity(1);
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Span(span) => {
                spans.push(span);
                worker.flush_spans(&mut spans).await;
            }
            Command::Log(log) => {
                logs.push(log);
                worker.flush_logs(&mut logs).await;
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

async fn run_batch(
    worker: Worker,
    mut rx: mpsc::Receiver<Command>,
    batch_size: usize,
    flush_interval: Duration,
) {
    let mut ticker = tokio::time::interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut spans = Vec::new();
    let mut logs = Vec::new();
    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(Command::Span(span)) => {
                    spans.push(span);
                    if spans.len() >= batch_size {
                        worker.flush_spans(&mut spans).await;
                    }
                }
                Some(Command::Log(log)) => {
                    logs.push(log);
                    if logs.len() >= batch_size {
                        worker.flush_logs(&mut logs).await;
                    }
                }
                Some(Command::Flush(done)) => {
                    worker.flush_spans(&mut spans).await;
                    worker.flush_logs(&mut logs).await;
                    let _ = done.send(());
                }
                None => break,
            },
            _ = ticker.tick() => {
                worker.flush_spans(&mut spans).await;
                worker.flush_logs(&mut logs).await;
            }
        }
    }

    worker.flush_spans(&mut spans).await;
    worker.flush_logs(&mut logs).await;
}
