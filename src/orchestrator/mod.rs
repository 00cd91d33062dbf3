//! Runs every pipeline concurrently, merges their snapshots into one output
//! stream, and stops the whole group on the first failure.

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::error::{OrchestratorError, PipelineError};
use crate::pipeline::Pipeline;
use crate::shutdown::{
    ShutdownReceiver, ShutdownSender, request_shutdown, shutdown_channel, wait_for_shutdown,
};
use crate::source::AggregateSnapshot;

type PipelineOutcome = (&'static str, Result<(), PipelineError>);

/// Requests a clean stop of a running [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct StopHandle {
    stop_tx: ShutdownSender,
}

impl StopHandle {
    pub fn stop(&self) {
        if request_shutdown(&self.stop_tx) {
            info!("Stop requested");
        }
    }
}

pub struct Orchestrator {
    pipelines: Vec<Box<dyn Pipeline>>,
    stop_tx: ShutdownSender,
    stop_rx: ShutdownReceiver,
}

impl Orchestrator {
    #[must_use]
    pub fn new(pipelines: Vec<Box<dyn Pipeline>>) -> Self {
        let (stop_tx, stop_rx) = shutdown_channel();
        Self {
            pipelines,
            stop_tx,
            stop_rx,
        }
    }

    #[must_use]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Bounded output queue sized to the pipeline count.
    #[must_use]
    pub fn output_channel(
        &self,
    ) -> (
        mpsc::Sender<AggregateSnapshot>,
        mpsc::Receiver<AggregateSnapshot>,
    ) {
        mpsc::channel(self.queue_capacity())
    }

    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop_tx: self.stop_tx.clone(),
        }
    }

    fn queue_capacity(&self) -> usize {
        self.pipelines.len().max(1)
    }

    /// Runs all pipelines until `external_shutdown` fires, [`StopHandle::stop`]
    /// is called, or a pipeline fails.
    ///
    /// Every pipeline task and the fan-in task have exited by the time this
    /// returns, and `out` is dropped, so the consumer sees the stream end.
    ///
    /// # Errors
    ///
    /// Returns the first pipeline failure, wrapped with the pipeline name, or
    /// [`OrchestratorError::NoPipelines`] when there is nothing to run.
    pub async fn run(
        self,
        mut external_shutdown: ShutdownReceiver,
        out: mpsc::Sender<AggregateSnapshot>,
    ) -> Result<(), OrchestratorError> {
        if self.pipelines.is_empty() {
            return Err(OrchestratorError::NoPipelines);
        }
        let capacity = self.queue_capacity();
        let Self {
            pipelines,
            stop_tx: _stop_tx,
            mut stop_rx,
        } = self;

        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let (relay_tx, relay_rx) = mpsc::channel(capacity);

        let mut tasks: JoinSet<PipelineOutcome> = JoinSet::new();
        for mut pipeline in pipelines {
            let shutdown_rx = shutdown_rx.clone();
            let relay_tx = relay_tx.clone();
            tasks.spawn(async move {
                let name = pipeline.name();
                (name, pipeline.run(shutdown_rx, relay_tx).await)
            });
        }
        drop(relay_tx);
        let fan_in = spawn_fan_in(relay_rx, out, shutdown_rx);
        info!(pipelines = tasks.len(), "Daemon started");

        let outcome = loop {
            tokio::select! {
                () = wait_for_shutdown(&mut external_shutdown) => {
                    info!("Shutdown signal received");
                    break Ok(());
                }
                () = wait_for_shutdown(&mut stop_rx) => break Ok(()),
                joined = tasks.join_next() => match joined {
                    None => break Ok(()),
                    Some(Ok((name, Ok(())))) => debug!(source = name, "Pipeline exited"),
                    Some(Ok((name, Err(err)))) => {
                        error!(source = name, "Pipeline failed: {}", err);
                        break Err(OrchestratorError::PipelineFailed {
                            source_name: name,
                            source: err,
                        });
                    }
                    Some(Err(err)) => break Err(OrchestratorError::from(err)),
                },
            }
        };

        request_shutdown(&shutdown_tx);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => debug!(source = name, "Pipeline exited"),
                Ok((name, Err(err))) => {
                    warn!(source = name, "Pipeline failed during shutdown: {}", err);
                }
                Err(err) => warn!("Pipeline task failed during shutdown: {}", err),
            }
        }
        if let Err(err) = fan_in.await {
            warn!("Fan-in task failed: {}", err);
        }
        info!("Daemon stopped");
        outcome
    }
}

/// Relays snapshots from every pipeline into `out` until shutdown or until
/// all pipelines have dropped their senders. Nothing is forwarded once the
/// shutdown signal is set, even if snapshots are still queued.
fn spawn_fan_in(
    mut relay_rx: mpsc::Receiver<AggregateSnapshot>,
    out: mpsc::Sender<AggregateSnapshot>,
    mut shutdown_rx: ShutdownReceiver,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let snapshot = tokio::select! {
                biased;
                () = wait_for_shutdown(&mut shutdown_rx) => break,
                maybe = relay_rx.recv() => match maybe {
                    Some(snapshot) => snapshot,
                    None => break,
                },
            };
            tokio::select! {
                biased;
                () = wait_for_shutdown(&mut shutdown_rx) => break,
                sent = out.send(snapshot) => {
                    if sent.is_err() {
                        debug!("Output receiver dropped; stopping fan-in");
                        break;
                    }
                }
            }
        }
    })
}
