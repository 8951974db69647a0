pub mod export;
pub mod logger;
pub mod otlp;
pub mod processor;
pub mod propagation;
pub mod provider;
pub mod tracer;

pub use export::{Compression, Exporter, MemoryExporter, OtlpHttpExporter};
pub use logger::Logger;
pub use processor::{ExportMode, Processor, ProcessorConfig};
pub use provider::Telemetry;
pub use tracer::{Span, SpanBuilder, Tracer};
