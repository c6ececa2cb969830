//! Observability.
//!
//! Every subsystem logs through `tracing` with structured fields
//! (`connection`, `role`, `timeout_ms`, `error`). Nothing is printed unless
//! the embedding binary installs a subscriber via `logging::init_logging`.

pub mod logging;
