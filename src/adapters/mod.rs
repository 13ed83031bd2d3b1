// Adapters layer: concrete implementations of the domain ports.

pub mod process;
pub mod report;

pub use process::TokioSpawner;
pub use report::LocalReportSink;
