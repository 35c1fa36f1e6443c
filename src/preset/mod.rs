//! Whole-registry migration pre-stage
//!
//! Before the engine runs, this preset mirrors the namespace layout of a
//! source registry onto a target registry and generates the transfer rules
//! for every repository, excluding namespaces that could not be created.
//! The vendor-specific discovery and creation APIs stay behind
//! [`SourceRegistryApi`] and [`TargetRegistryApi`]; callers inject their
//! cloud provider's implementation.

use crate::engine::{TransferEngine, TransferReport};
use crate::error::{Result, TransferError};
use crate::logging::Logger;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Source-registry discovery API
#[async_trait]
pub trait SourceRegistryApi: Send + Sync {
    /// Enumerate every namespace of the source registry
    async fn namespaces(&self) -> Result<Vec<String>>;

    /// Generate the full rule map (`target_ref → source_ref`), excluding
    /// repositories in the `skip` namespaces
    async fn transfer_rules(&self, skip: &[String]) -> Result<HashMap<String, String>>;
}

/// Target-registry namespace API
#[async_trait]
pub trait TargetRegistryApi: Send + Sync {
    /// Enumerate every namespace currently present on the target
    async fn namespaces(&self) -> Result<Vec<String>>;

    async fn create_namespace(&self, name: &str) -> Result<()>;
}

/// Drives the migration: namespace sync with bounded retry, rule
/// generation, then an inverted engine run.
pub struct MigrationPreset {
    source: Arc<dyn SourceRegistryApi>,
    target: Arc<dyn TargetRegistryApi>,
    retry_nums: usize,
    logger: Logger,
}

impl MigrationPreset {
    pub fn new(
        source: Arc<dyn SourceRegistryApi>,
        target: Arc<dyn TargetRegistryApi>,
        retry_nums: usize,
        logger: Logger,
    ) -> Self {
        Self {
            source,
            target,
            retry_nums,
            logger,
        }
    }

    /// Run the pre-stage and then the engine.
    ///
    /// Namespace enumeration and rule generation failures are fatal.
    /// Individual namespace creation failures are retried up to the bound,
    /// then skipped; the run still transfers everything else.
    pub async fn run(&self, engine: &TransferEngine) -> Result<TransferReport> {
        let source_ns = self
            .source
            .namespaces()
            .await
            .map_err(|e| TransferError::Preset(format!("enumerate source namespaces: {}", e)))?;
        let target_ns = self
            .target
            .namespaces()
            .await
            .map_err(|e| TransferError::Preset(format!("enumerate target namespaces: {}", e)))?;

        let mut failed_ns = self.create_missing(&source_ns, &target_ns).await;

        if !failed_ns.is_empty() {
            self.logger.info(
                "Some source namespaces failed to create on the target, retrying ...",
            );
            for _ in 0..self.retry_nums {
                if failed_ns.is_empty() {
                    break;
                }
                match self.target.namespaces().await {
                    Ok(current) => {
                        failed_ns = self.create_missing(&failed_ns, &current).await;
                    }
                    Err(err) => {
                        // The round is consumed, the remaining list stands.
                        self.logger.error(&format!(
                            "Re-enumerating target namespaces failed: {}",
                            err
                        ));
                    }
                }
            }
        }

        if !failed_ns.is_empty() {
            self.logger.warning(&format!(
                "Namespaces not created on the target, their repositories are skipped: {:?}",
                failed_ns
            ));
        }

        let rules = self
            .source
            .transfer_rules(&failed_ns)
            .await
            .map_err(|e| TransferError::Preset(format!("generate transfer rules: {}", e)))?;

        self.logger
            .info(&format!("Generated {} transfer rules", rules.len()));

        // The rule map is keyed by target reference, hence the inverted run.
        engine.run(&rules, true).await
    }

    /// Create every wanted namespace missing from `existing`; returns the
    /// ones whose creation failed.
    async fn create_missing(&self, wanted: &[String], existing: &[String]) -> Vec<String> {
        let mut failed = Vec::new();
        for ns in wanted {
            if existing.contains(ns) {
                continue;
            }
            if let Err(err) = self.target.create_namespace(ns).await {
                self.logger
                    .error(&format!("Create namespace {} failed: {}", ns, err));
                failed.push(ns.clone());
            } else {
                self.logger.detail(&format!("Created namespace {}", ns));
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransferConfig;
    use crate::transfer::{BoxedJob, ImageClient, ImageEndpoint, TransferJob};
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct StubSource {
        namespaces: Vec<String>,
        rules: HashMap<String, String>,
    }

    #[async_trait]
    impl SourceRegistryApi for StubSource {
        async fn namespaces(&self) -> Result<Vec<String>> {
            Ok(self.namespaces.clone())
        }

        async fn transfer_rules(&self, skip: &[String]) -> Result<HashMap<String, String>> {
            Ok(self
                .rules
                .iter()
                .filter(|(target, _)| !skip.iter().any(|ns| target.contains(ns.as_str())))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect())
        }
    }

    #[derive(Default)]
    struct StubTarget {
        existing: Mutex<Vec<String>>,
        fail_counts: Mutex<HashMap<String, usize>>,
        create_calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TargetRegistryApi for StubTarget {
        async fn namespaces(&self) -> Result<Vec<String>> {
            Ok(self.existing.lock().unwrap().clone())
        }

        async fn create_namespace(&self, name: &str) -> Result<()> {
            self.create_calls.lock().unwrap().push(name.to_string());
            let mut counts = self.fail_counts.lock().unwrap();
            if let Some(remaining) = counts.get_mut(name) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(TransferError::Registry("namespace quota".to_string()));
                }
            }
            self.existing.lock().unwrap().push(name.to_string());
            Ok(())
        }
    }

    struct RecordingJob {
        executed: Arc<Mutex<Vec<String>>>,
        source: String,
    }

    #[async_trait]
    impl TransferJob for RecordingJob {
        fn source_url(&self) -> String {
            self.source.clone()
        }
        fn target_url(&self) -> String {
            self.source.clone()
        }
        async fn run(&self) -> Result<()> {
            self.executed.lock().unwrap().push(self.source.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingClient {
        executed: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ImageClient for RecordingClient {
        async fn list_tags(&self, _source: &ImageEndpoint) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn build_job(
            &self,
            source: ImageEndpoint,
            _target: ImageEndpoint,
        ) -> Result<BoxedJob> {
            Ok(Box::new(RecordingJob {
                executed: Arc::clone(&self.executed),
                source: source.url(),
            }))
        }
    }

    fn engine(client: RecordingClient) -> TransferEngine {
        let config = TransferConfig {
            routine_nums: 2,
            retry_nums: 0,
            ..Default::default()
        };
        TransferEngine::new(Arc::new(config), Arc::new(client), Logger::new_quiet())
    }

    #[tokio::test]
    async fn test_creates_missing_namespaces_and_runs_inverted() {
        let source = StubSource {
            namespaces: vec!["team-a".to_string(), "team-b".to_string()],
            rules: HashMap::from([(
                "tcr.example/team-a/app:v1".to_string(),
                "ccr.example/team-a/app:v1".to_string(),
            )]),
        };
        let target = Arc::new(StubTarget::default());
        target.existing.lock().unwrap().push("team-b".to_string());

        let client = RecordingClient::default();
        let executed = Arc::clone(&client.executed);
        let engine = engine(client);

        let preset = MigrationPreset::new(
            Arc::new(source),
            Arc::clone(&target) as Arc<dyn TargetRegistryApi>,
            2,
            Logger::new_quiet(),
        );
        let report = preset.run(&engine).await.unwrap();

        assert!(report.is_clean());
        // Only the missing namespace was created.
        assert_eq!(target.create_calls.lock().unwrap().as_slice(), ["team-a"]);
        // The rule map is keyed by target, so the executed source is the
        // source registry's reference.
        assert_eq!(
            executed.lock().unwrap().as_slice(),
            ["ccr.example/team-a/app:v1"]
        );
    }

    #[tokio::test]
    async fn test_namespace_creation_retries_until_success() {
        let source = StubSource {
            namespaces: vec!["flaky".to_string()],
            rules: HashMap::new(),
        };
        let target = Arc::new(StubTarget::default());
        target
            .fail_counts
            .lock()
            .unwrap()
            .insert("flaky".to_string(), 2);

        let preset = MigrationPreset::new(
            Arc::new(source),
            Arc::clone(&target) as Arc<dyn TargetRegistryApi>,
            3,
            Logger::new_quiet(),
        );
        let report = preset.run(&engine(RecordingClient::default())).await.unwrap();

        assert!(report.is_clean());
        assert_eq!(target.create_calls.lock().unwrap().len(), 3);
        assert!(target
            .existing
            .lock()
            .unwrap()
            .contains(&"flaky".to_string()));
    }

    #[tokio::test]
    async fn test_residual_namespaces_are_skipped_not_fatal() {
        let source = StubSource {
            namespaces: vec!["ok".to_string(), "broken".to_string()],
            rules: HashMap::from([
                (
                    "tcr.example/ok/app:v1".to_string(),
                    "ccr.example/ok/app:v1".to_string(),
                ),
                (
                    "tcr.example/broken/app:v1".to_string(),
                    "ccr.example/broken/app:v1".to_string(),
                ),
            ]),
        };
        let target = Arc::new(StubTarget::default());
        target
            .fail_counts
            .lock()
            .unwrap()
            .insert("broken".to_string(), usize::MAX);

        let client = RecordingClient::default();
        let executed = Arc::clone(&client.executed);
        let engine = engine(client);

        let preset = MigrationPreset::new(
            Arc::new(source),
            Arc::clone(&target) as Arc<dyn TargetRegistryApi>,
            1,
            Logger::new_quiet(),
        );
        let report = preset.run(&engine).await.unwrap();

        assert!(report.is_clean());
        let executed = executed.lock().unwrap();
        let executed: HashSet<&str> = executed.iter().map(String::as_str).collect();
        assert_eq!(executed, HashSet::from(["ccr.example/ok/app:v1"]));
    }

    #[tokio::test]
    async fn test_source_enumeration_failure_is_fatal() {
        struct BrokenSource;

        #[async_trait]
        impl SourceRegistryApi for BrokenSource {
            async fn namespaces(&self) -> Result<Vec<String>> {
                Err(TransferError::Registry("api unavailable".to_string()))
            }
            async fn transfer_rules(
                &self,
                _skip: &[String],
            ) -> Result<HashMap<String, String>> {
                unreachable!()
            }
        }

        let preset = MigrationPreset::new(
            Arc::new(BrokenSource),
            Arc::new(StubTarget::default()),
            1,
            Logger::new_quiet(),
        );
        let result = preset.run(&engine(RecordingClient::default())).await;
        assert!(matches!(result, Err(TransferError::Preset(_))));
    }
}
