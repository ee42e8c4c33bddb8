//! Structured logging setup.
//!
//! Log output format (pretty, compact, JSON), level and filter directives
//! come from `[observability.logging]`; `RUST_LOG` takes precedence.

mod tracing_init;

pub use tracing_init::*;
