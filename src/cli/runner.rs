//! Wires configuration, the registry client, and the engine together

use crate::cli::args::Args;
use crate::config::TransferConfig;
use crate::engine::{TransferEngine, TransferReport};
use crate::error::{Result, TransferError};
use crate::logging::Logger;
use crate::preset::{MigrationPreset, SourceRegistryApi, TargetRegistryApi};
use crate::registry::OciImageClient;
use std::path::Path;
use std::sync::Arc;

/// A source/target pair of vendor API clients for the migration preset
pub struct MigrationProvider {
    pub source: Arc<dyn SourceRegistryApi>,
    pub target: Arc<dyn TargetRegistryApi>,
}

pub struct Runner {
    config: Arc<TransferConfig>,
    logger: Logger,
    migration: Option<MigrationProvider>,
}

impl Runner {
    pub fn new(args: &Args) -> Result<Self> {
        args.validate().map_err(TransferError::Config)?;

        let logger = if args.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(args.verbose)
        };

        let mut config = match &args.config {
            Some(path) => TransferConfig::from_file(Path::new(path))?,
            None => TransferConfig::default(),
        };
        config = config.from_env();

        if let Some(routines) = args.routines {
            config.routine_nums = routines;
        }
        if let Some(retries) = args.retries {
            config.retry_nums = retries;
        }
        if let Some(registry) = &args.default_registry {
            config.default_registry = registry.clone();
        }
        if let Some(namespace) = &args.default_namespace {
            config.default_namespace = namespace.clone();
        }

        config.validate()?;

        Ok(Self {
            config: Arc::new(config),
            logger,
            migration: None,
        })
    }

    /// Inject the vendor API clients used when the migration preset is
    /// selected. The shipped binary carries none; library users supply
    /// their cloud provider's implementation.
    pub fn with_migration_provider(mut self, provider: MigrationProvider) -> Self {
        self.migration = Some(provider);
        self
    }

    /// Run the transfer. The returned report lists residual failures;
    /// their presence is not an error.
    pub async fn run(&self) -> Result<TransferReport> {
        self.logger.info("Starting registry transfer");

        let client = Arc::new(OciImageClient::new(self.logger.clone()));
        let engine = TransferEngine::new(
            Arc::clone(&self.config),
            client,
            self.logger.clone(),
        );

        let report = if self.config.ccr_to_tcr {
            let provider = self.migration.as_ref().ok_or_else(|| {
                TransferError::Preset(
                    "ccr_to_tcr is set but no migration provider is configured".to_string(),
                )
            })?;
            let preset = MigrationPreset::new(
                Arc::clone(&provider.source),
                Arc::clone(&provider.target),
                self.config.retry_nums,
                self.logger.clone(),
            );
            preset.run(&engine).await?
        } else {
            engine.run(&self.config.image_list, false).await?
        };

        if report.is_clean() {
            self.logger.info("Transfer completed with no failures");
        }
        Ok(report)
    }
}
