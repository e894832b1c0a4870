pub mod build_info;
pub mod tracing_setup;

pub use tracing_setup::DEFAULT_LOG_DIRECTIVES;
