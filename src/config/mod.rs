#[cfg(feature = "cli")]
pub mod cli;
pub mod pipeline;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use pipeline::{PipelineConfig, StepConfig};
