use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "devpipe")]
#[command(about = "A sequential runner for developer tool pipelines")]
pub struct CliConfig {
    /// Path to the pipeline TOML file
    #[arg(short, long, default_value = "devpipe.toml")]
    pub config: String,

    /// Package name for the built-in python-dev pipeline, used when the
    /// config file does not exist
    #[arg(long)]
    pub package: Option<String>,

    /// Nested plugin directory the built-in pipeline installs after the
    /// project itself
    #[arg(long)]
    pub plugin_dir: Option<String>,

    /// Run only the named steps (comma separated), keeping pipeline order
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Directory step working directories resolve against
    #[arg(long, default_value = ".")]
    pub root: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Print the full invocation trace without spawning anything
    #[arg(long)]
    pub dry_run: bool,

    /// List the pipeline's steps and exit
    #[arg(long)]
    pub list: bool,

    /// Override the monitoring setting from the config
    #[arg(long)]
    pub monitor: Option<bool>,

    /// Keep running after a step fails and report all failures at the end
    #[arg(long)]
    pub continue_on_error: bool,

    /// Write the JSON run report under this directory
    #[arg(long)]
    pub report_path: Option<String>,

    /// Emit one JSON object per log line, for CI log collectors
    #[arg(long)]
    pub log_json: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("config", &self.config)?;
        validation::validate_path("root", &self.root)?;

        for name in &self.only {
            validation::validate_non_empty_string("only", name)?;
        }
        if let Some(package) = &self.package {
            validation::validate_non_empty_string("package", package)?;
        }
        if let Some(plugin_dir) = &self.plugin_dir {
            validation::validate_path("plugin_dir", plugin_dir)?;
        }
        if let Some(path) = &self.report_path {
            validation::validate_path("report_path", path)?;
        }

        Ok(())
    }
}
