//! Rule expansion worker pool
//!
//! Each worker drains the pending pair queue, expanding every pair into
//! either concrete jobs (sent into the bounded job channel) or further
//! pairs (pushed back for re-expansion). The pool owns the job channel
//! close: every worker holds a `Sender` clone, so the channel closes exactly
//! once, when the last worker exits.

use crate::config::TransferConfig;
use crate::engine::queues::{UrlPair, WorkQueues};
use crate::error::{Result, TransferError};
use crate::logging::Logger;
use crate::reference::RepoRef;
use crate::transfer::{BoxedJob, Credentials, ImageClient, ImageEndpoint};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Shared state for one rule pool run
pub(crate) struct RuleContext {
    pub queues: Arc<WorkQueues>,
    pub client: Arc<dyn ImageClient>,
    pub config: Arc<TransferConfig>,
    pub logger: Logger,
}

/// Run `workers` rule workers to completion.
///
/// Consumes the local `Sender`; the job channel closes when the pool
/// finishes and every clone has been dropped.
pub(crate) async fn run_pool(ctx: Arc<RuleContext>, workers: usize, tx: mpsc::Sender<BoxedJob>) {
    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let tx = tx.clone();
            tokio::spawn(worker_loop(ctx, tx))
        })
        .collect();
    drop(tx);
    join_all(handles).await;
}

async fn worker_loop(ctx: Arc<RuleContext>, tx: mpsc::Sender<BoxedJob>) {
    while let Some(pair) = ctx.queues.pop_pair() {
        match expand(&ctx, &pair, &tx).await {
            Ok(more_pairs) => {
                if !more_pairs.is_empty() {
                    ctx.queues.push_pairs(more_pairs);
                }
            }
            Err(err) => {
                ctx.logger.error(&format!(
                    "Expanding {} to {} failed: {}",
                    pair.source, pair.target, err
                ));
                ctx.queues.push_failed_pair(pair);
            }
        }
    }
}

/// Expand one pair.
///
/// Multi-tag and all-tags sources return replacement pairs for requeueing
/// and emit no job; a single-tag source emits exactly one job into the
/// channel and returns no pairs.
pub(crate) async fn expand(
    ctx: &RuleContext,
    pair: &UrlPair,
    tx: &mpsc::Sender<BoxedJob>,
) -> Result<Vec<UrlPair>> {
    if pair.source.is_empty() {
        return Err(TransferError::Expansion(
            "source url should not be empty".to_string(),
        ));
    }

    let source = RepoRef::parse(&pair.source)
        .map_err(|e| TransferError::Expansion(format!("url {} format error: {}", pair.source, e)))?;

    // A rule without a target falls back to the configured defaults.
    let target_str = if pair.target.is_empty() {
        if !ctx.config.has_target_defaults() {
            return Err(TransferError::Expansion(
                "default registry and namespace must be configured when a rule has no target"
                    .to_string(),
            ));
        }
        format!(
            "{}/{}/{}",
            ctx.config.default_registry,
            ctx.config.default_namespace,
            source.repo_with_tag()
        )
    } else {
        pair.target.clone()
    };

    let target = RepoRef::parse(&target_str)
        .map_err(|e| TransferError::Expansion(format!("url {} format error: {}", target_str, e)))?;

    // Comma-separated tag list: one replacement pair per tag.
    if source.has_multiple_tags() {
        if !target.tag().is_empty() && target.tag() != source.tag() {
            return Err(TransferError::Expansion(format!(
                "multi-tag source must not correspond to a target with a tag: {}:{}",
                source.url(),
                target.url()
            )));
        }
        let pairs = source
            .tags()
            .iter()
            .map(|tag| {
                UrlPair::new(
                    format!("{}:{}", source.url_without_tag(), tag),
                    format!("{}:{}", target.url_without_tag(), tag),
                )
            })
            .collect();
        return Ok(pairs);
    }

    // Empty tag: transfer every tag of the repository.
    if source.tag().is_empty() {
        if !target.tag().is_empty() {
            return Err(TransferError::Expansion(format!(
                "tag must be set on both sides or neither: {}:{}",
                source.url(),
                target.url()
            )));
        }

        let endpoint = endpoint_for(ctx, &source, "");
        let tags = ctx.client.list_tags(&endpoint).await.map_err(|e| {
            TransferError::Expansion(format!("get tags of {} failed: {}", source.url(), e))
        })?;
        ctx.logger
            .detail(&format!("Tags of {}: {:?}", source.url(), tags));

        let pairs = tags
            .iter()
            .map(|tag| {
                UrlPair::new(
                    format!("{}:{}", source.url_without_tag(), tag),
                    format!("{}:{}", target.url_without_tag(), tag),
                )
            })
            .collect();
        return Ok(pairs);
    }

    // Single concrete tag: the target inherits the source tag when unset.
    let dest_tag = if target.tag().is_empty() {
        source.tag()
    } else {
        target.tag()
    };

    let source_endpoint = endpoint_for(ctx, &source, source.tag());
    let target_endpoint = endpoint_for(ctx, &target, dest_tag);

    let job = ctx
        .client
        .build_job(source_endpoint, target_endpoint)
        .await
        .map_err(|e| {
            TransferError::Expansion(format!("generate job for {} failed: {}", source.url(), e))
        })?;

    ctx.logger.detail(&format!(
        "Generated a job for {} to {}",
        source.url(),
        target.url()
    ));

    // The receiver pool outlives every sender, so this only fails if the
    // run is being torn down; surface it rather than dropping the job.
    tx.send(job).await.map_err(|_| {
        TransferError::Expansion(format!("job channel closed while expanding {}", source.url()))
    })?;

    Ok(Vec::new())
}

fn endpoint_for(ctx: &RuleContext, reference: &RepoRef, tag: &str) -> ImageEndpoint {
    let credentials = match ctx
        .config
        .secret_for(reference.registry(), reference.namespace())
    {
        Some(secret) => {
            ctx.logger.detail(&format!(
                "Found auth information for {}, username: {}",
                reference.url(),
                secret.username
            ));
            Credentials::new(&secret.username, &secret.password, secret.insecure)
        }
        None => {
            ctx.logger.detail(&format!(
                "No auth information for {}, access will be anonymous",
                reference.url()
            ));
            Credentials::anonymous()
        }
    };
    ImageEndpoint::new(
        reference.registry(),
        reference.repo_with_namespace(),
        tag,
        credentials,
    )
}
