//! General utility code that didn't fit anywhere else
// (c) 2026 Ross Younger

pub(crate) mod time;

mod tracing;
pub use tracing::{
    ConsoleTraceType, TimeFormat, is_initialized as tracing_is_initialised, setup as setup_tracing,
};
