//! Job execution worker pool
//!
//! Workers share the receiving end of the bounded job channel and execute
//! jobs until the channel is closed and drained. Failures are recorded in
//! the failed-job queue; jobs are independent and carry no ordering
//! contract.

use crate::engine::queues::WorkQueues;
use crate::logging::Logger;
use crate::transfer::BoxedJob;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Run `workers` job workers until the channel closes and drains.
pub(crate) async fn run_pool(
    queues: Arc<WorkQueues>,
    logger: Logger,
    workers: usize,
    rx: mpsc::Receiver<BoxedJob>,
) {
    let rx = Arc::new(Mutex::new(rx));
    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let queues = Arc::clone(&queues);
            let rx = Arc::clone(&rx);
            let logger = logger.clone();
            tokio::spawn(worker_loop(queues, logger, rx))
        })
        .collect();
    join_all(handles).await;
}

async fn worker_loop(
    queues: Arc<WorkQueues>,
    logger: Logger,
    rx: Arc<Mutex<mpsc::Receiver<BoxedJob>>>,
) {
    loop {
        // The lock is only held for the receive itself, never while the
        // job runs, so transfers proceed concurrently.
        let job = { rx.lock().await.recv().await };
        let Some(job) = job else {
            break;
        };

        if let Err(err) = job.run().await {
            logger.error(&format!(
                "Transfer {} to {} failed: {}",
                job.source_url(),
                job.target_url(),
                err
            ));
            queues.push_failed_job(job);
        } else {
            logger.detail(&format!(
                "Transferred {} to {}",
                job.source_url(),
                job.target_url()
            ));
        }
    }
}
