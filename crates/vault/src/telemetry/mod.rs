//! Structured logging and optional OpenTelemetry span export.
//!
//! Logs are always emitted as JSON to stdout. When
//! `OTEL_EXPORTER_OTLP_ENDPOINT` is set, spans are also exported via
//! OTLP/gRPC to that collector.
//!
//! # Telemetry invariants
//!
//! - **No key material or file contents** may appear in any span attribute or
//!   log field. File names and sizes are fine; the key fingerprint is fine.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`) and is
//!   overridden by `RUST_LOG` when present.

pub mod init;

pub use init::init_telemetry;
