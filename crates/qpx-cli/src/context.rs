//! Shared setup for every command: configuration, HTTP client, providers.

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use std::sync::Arc;

use qpx_pm::cli::{Output, ProgressManager, Verbosity};
use qpx_pm::http::HttpClient;
use qpx_pm::{Config, HttpRegistry, PackageInstaller, ProviderSelector, Registry};

/// Flags accepted by every subcommand
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub verbose: u8,
    pub quiet: bool,
    pub working_dir: PathBuf,
}

pub struct Context {
    pub config: Config,
    pub working_dir: PathBuf,
    pub output: Output,
    http_client: Arc<HttpClient>,
    progress: Arc<ProgressManager>,
}

impl Context {
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let working_dir = global
            .working_dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve working directory {}", global.working_dir.display()))?;

        let config = Config::build(Some(&working_dir), true)?;

        let http_client = HttpClient::with_config(config.http_client_config())
            .context("Failed to create HTTP client")?;

        let mut output = Output::new();
        output.set_verbosity(if global.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::from_occurrences(global.verbose)
        });

        Ok(Self {
            config,
            working_dir,
            progress: Arc::new(ProgressManager::new(!global.quiet)),
            output,
            http_client: Arc::new(http_client),
        })
    }

    pub fn selector(&self) -> ProviderSelector {
        ProviderSelector::new(&self.config, self.http_client.clone()).with_progress(self.progress.clone())
    }

    pub fn registry(&self) -> Arc<dyn Registry> {
        Arc::new(HttpRegistry::new(&self.config.registry_url, self.http_client.clone()))
    }

    pub fn installer(&self) -> PackageInstaller {
        PackageInstaller::new(&self.config, &self.working_dir, self.registry(), self.selector())
            .with_output(self.output.clone())
    }
}
