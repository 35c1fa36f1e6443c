//! Concurrent transfer engine
//!
//! The engine runs a two-stage pipeline: a pool of rule workers expands
//! source/target reference pairs into concrete single-tag jobs, feeding a
//! pool of job workers through a bounded channel sized to the worker count.
//! Failed expansions and failed jobs land in their own queues and are fed
//! back through the pipeline for a bounded number of retry rounds; whatever
//! remains afterwards is reported.

pub mod queues;

mod jobs;
mod rules;

use crate::config::TransferConfig;
use crate::error::Result;
use crate::logging::Logger;
use crate::transfer::{BoxedJob, ImageClient};
use rules::RuleContext;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

pub use queues::{UrlPair, WorkQueues};

/// End-of-run summary over the two failure queues
#[derive(Debug, Clone, Default)]
pub struct TransferReport {
    /// Remaining failed jobs as (source url, target url)
    pub failed_jobs: Vec<(String, String)>,
    /// Remaining failed pairs as (source, target)
    pub failed_pairs: Vec<(String, String)>,
}

impl TransferReport {
    pub fn is_clean(&self) -> bool {
        self.failed_jobs.is_empty() && self.failed_pairs.is_empty()
    }
}

/// Orchestrates a single transfer run
pub struct TransferEngine {
    config: Arc<TransferConfig>,
    client: Arc<dyn ImageClient>,
    queues: Arc<WorkQueues>,
    logger: Logger,
}

impl TransferEngine {
    pub fn new(config: Arc<TransferConfig>, client: Arc<dyn ImageClient>, logger: Logger) -> Self {
        Self {
            config,
            client,
            queues: Arc::new(WorkQueues::new()),
            logger,
        }
    }

    /// Run the pipeline over a rule map.
    ///
    /// With `invert` set, each map entry is treated as `target → source`
    /// (the migration preset produces its rules keyed by target). Failed
    /// jobs and pairs never make this return an error; they appear in the
    /// report instead.
    pub async fn run(
        &self,
        image_list: &HashMap<String, String>,
        invert: bool,
    ) -> Result<TransferReport> {
        for (key, value) in image_list {
            let pair = if invert {
                UrlPair::new(value.clone(), key.clone())
            } else {
                UrlPair::new(key.clone(), value.clone())
            };
            self.queues.push_pair(pair);
        }

        self.logger
            .info("Start to handle transfer jobs, please wait ...");
        self.pipeline_round(true).await;

        if self.config.retry_nums > 0 {
            self.logger.info("Start to retry failed jobs ...");
            for _ in 0..self.config.retry_nums {
                self.retry_round().await;
            }
        }

        let report = self.report();
        self.log_report(&report);
        Ok(report)
    }

    /// One pass of the two-stage pipeline.
    ///
    /// The job pool is spawned first, then failed jobs from the previous
    /// round (retry only) are drained into the channel, then the rule pool
    /// runs against the pending pair queue. The rule pool owns the channel
    /// close; on a retry round with no failed pairs the sender is dropped
    /// here instead.
    async fn pipeline_round(&self, initial: bool) {
        let workers = self.config.routine_nums;
        let (tx, rx) = mpsc::channel::<BoxedJob>(workers);

        let job_pool = tokio::spawn(jobs::run_pool(
            Arc::clone(&self.queues),
            self.logger.clone(),
            workers,
            rx,
        ));

        if !initial {
            // Consumers are already draining, so a backlog larger than the
            // channel capacity cannot deadlock these sends.
            for job in self.queues.drain_failed_jobs() {
                if tx.send(job).await.is_err() {
                    break;
                }
            }
        }

        let run_rules = initial || self.queues.requeue_failed_pairs() > 0;
        if run_rules {
            let ctx = Arc::new(RuleContext {
                queues: Arc::clone(&self.queues),
                client: Arc::clone(&self.client),
                config: Arc::clone(&self.config),
                logger: self.logger.clone(),
            });
            rules::run_pool(ctx, workers, tx).await;
        } else {
            drop(tx);
        }

        // Awaiting the job pool transitively awaits the rule pool: the
        // channel only closes after every rule worker has exited.
        let _ = job_pool.await;
    }

    async fn retry_round(&self) {
        self.pipeline_round(false).await;
    }

    /// Snapshot the failure queues into a report
    pub fn report(&self) -> TransferReport {
        TransferReport {
            failed_jobs: self.queues.failed_job_urls(),
            failed_pairs: self.queues.failed_pair_urls(),
        }
    }

    fn log_report(&self, report: &TransferReport) {
        let failed_jobs: Vec<String> = report
            .failed_jobs
            .iter()
            .map(|(source, _)| source.clone())
            .collect();
        self.logger.failure_list(
            &format!("{} transfer jobs failed", failed_jobs.len()),
            &failed_jobs,
        );

        let failed_pairs: Vec<String> = report
            .failed_pairs
            .iter()
            .map(|(source, target)| format!("{} → {}", source, target))
            .collect();
        self.logger.failure_list(
            &format!("{} expansions failed", failed_pairs.len()),
            &failed_pairs,
        );

        self.logger.info(&format!(
            "Finished, {} transfer jobs failed, {} expansions failed",
            report.failed_jobs.len(),
            report.failed_pairs.len()
        ));
    }
}
