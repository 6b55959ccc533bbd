// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parallel target resolution: one task per reachable node, ordered by
//! completion signals.

use crate::JobGraph;
use hone_core::{BuildError, BuildLog, Job, Runner};
use parking_lot::Mutex;
use petgraph::Direction;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

impl JobGraph {
    /// Run everything `target` depends on, in parallel, through
    /// `runner`.
    ///
    /// Each task waits for its predecessors' completion signals, so a
    /// job starts only once every upstream job has definitively
    /// finished or failed. Failed predecessors short-circuit the job
    /// with a `FailedDependencies` error instead of running it.
    ///
    /// A service job's pipeline runs detached: the node completes as
    /// soon as the service task has started, downstream jobs proceed
    /// while it runs, and once all non-service work is done the `stop`
    /// signal (installed on every job) flips so services can wind
    /// down. A service that later fails still records the error on its
    /// job, but by then downstream tasks have already observed the
    /// completion signal — that late write is informational only.
    ///
    /// Returns every error the build produced, one per failed or
    /// dep-skipped job. Running jobs are not cancellable.
    pub async fn resolve_target(
        &self,
        target: &str,
        runner: Arc<dyn Runner>,
        log: Arc<BuildLog>,
    ) -> Vec<BuildError> {
        let indices = match self.sorted_reachable(target) {
            Ok(indices) => indices,
            Err(err) => return vec![err],
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let errors: Arc<Mutex<Vec<BuildError>>> = Arc::new(Mutex::new(Vec::new()));
        let services: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = Vec::with_capacity(indices.len());

        for idx in indices {
            let node = &self.graph[idx];
            let job = node.job.clone();
            let done = node.done.clone();
            job.attach_stop(stop_rx.clone());

            let preds: Vec<(Arc<Job>, watch::Receiver<bool>)> = self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .map(|pred| {
                    let pred = &self.graph[pred];
                    (pred.job.clone(), pred.done.subscribe())
                })
                .collect();

            let runner = runner.clone();
            let log = log.clone();
            let errors = errors.clone();
            let services = services.clone();

            tasks.push(tokio::spawn(async move {
                let mut preds = preds;
                for (_, rx) in preds.iter_mut() {
                    wait_done(rx).await;
                }

                let failed: Vec<String> = preds
                    .iter()
                    .filter(|(dep, _)| dep.error().is_some())
                    .map(|(dep, _)| dep.name.clone())
                    .collect();

                let result = if !failed.is_empty() {
                    let err = BuildError::FailedDependencies(failed);
                    job.fail(err.clone());
                    log.line(&job.name, &err.to_string());
                    Err(err)
                } else if job.service {
                    let (detached_tx, detached_rx) = oneshot::channel();
                    let service_job = job.clone();
                    let service_runner = runner.clone();

                    let handle = tokio::spawn(async move {
                        // Signal before entering the executor so the
                        // dependent node can complete immediately.
                        let _ = detached_tx.send(());
                        if let Err(err) = service_runner.run(&service_job).await {
                            service_job.fail(err);
                        }
                    });
                    services.lock().push(handle);

                    let _ = detached_rx.await;
                    Ok(())
                } else {
                    match runner.run(&job).await {
                        Ok(()) => Ok(()),
                        Err(err) => {
                            job.fail(err.clone());
                            Err(err)
                        }
                    }
                };

                // Completion closes after the error slot is written, so
                // downstream readers observe the final value.
                let _ = done.send(true);

                if let Err(err) = result {
                    errors.lock().push(err);
                }
            }));
        }

        for task in tasks {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "scheduler task panicked");
            }
        }

        // All non-service work is done; let services wind down, then
        // wait for them.
        let _ = stop_tx.send(true);
        let service_tasks = std::mem::take(&mut *services.lock());
        for task in service_tasks {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "service task panicked");
            }
        }

        let collected_errors = std::mem::take(&mut *errors.lock());
        collected_errors
    }
}

async fn wait_done(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}
