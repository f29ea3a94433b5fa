//! Engine handle: the public face of the job engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use order_core::{
    EngineConfig, EngineStats, JobEvent, JobId, JobState, JobStatus, OrderRequest, ResultLookup,
};
use ractor::{Actor, ActorRef};
use store::JobStore;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::dispatcher::{Dispatcher, DispatcherArgs};
use crate::messages::{DispatcherMessage, EngineError, WorkItem};
use crate::processor::OrderProcessor;

/// Handle to a running engine. Cloning is cheap; all clones share one engine.
#[derive(Clone)]
pub struct OrderEngine {
    store: Arc<JobStore>,
    dispatcher: ActorRef<DispatcherMessage>,
    event_tx: broadcast::Sender<JobEvent>,
    backlog: Arc<AtomicUsize>,
    accepting: Arc<AtomicBool>,
    max_pending: Option<usize>,
}

impl OrderEngine {
    /// Accept an order for asynchronous processing.
    ///
    /// Returns as soon as the job is recorded as `QUEUED`; processing never
    /// happens on the caller's task.
    pub fn submit(&self, request: OrderRequest) -> Result<JobId, EngineError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(EngineError::ShuttingDown);
        }
        self.reserve_slot()?;

        let job_id = JobId::new();
        let queued_at = Utc::now();
        if let Err(e) = self.store.insert_queued(job_id, queued_at) {
            self.backlog.fetch_sub(1, Ordering::SeqCst);
            return Err(e.into());
        }

        let _ = self.event_tx.send(JobEvent::JobQueued {
            job_id,
            timestamp: queued_at,
        });

        let work = WorkItem {
            job_id,
            request,
            queued_at,
        };
        if self
            .dispatcher
            .send_message(DispatcherMessage::Dispatch {
                work: Box::new(work),
            })
            .is_err()
        {
            // Dispatcher is gone; don't leave a job that nothing will run.
            self.store.remove(&job_id);
            self.backlog.fetch_sub(1, Ordering::SeqCst);
            return Err(EngineError::ShuttingDown);
        }

        tracing::debug!("Accepted job {}", job_id);
        Ok(job_id)
    }

    fn reserve_slot(&self) -> Result<(), EngineError> {
        match self.max_pending {
            Some(capacity) => self
                .backlog
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    (n < capacity).then_some(n + 1)
                })
                .map(|_| ())
                .map_err(|_| EngineError::Overloaded { capacity }),
            None => {
                self.backlog.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    /// Current status, or `None` if the identifier is unknown.
    pub fn status(&self, job_id: &JobId) -> Option<JobStatus> {
        self.store.status(job_id)
    }

    /// The result if the job completed, otherwise why it isn't available.
    pub fn result(&self, job_id: &JobId) -> ResultLookup {
        ResultLookup::from_state(self.store.state(job_id))
    }

    /// Full state record of a job.
    pub fn state(&self, job_id: &JobId) -> Option<JobState> {
        self.store.state(job_id)
    }

    /// The dispatcher actor.
    pub fn dispatcher(&self) -> &ActorRef<DispatcherMessage> {
        &self.dispatcher
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    /// Get a snapshot of engine statistics.
    pub async fn stats(&self) -> Result<EngineStats, EngineError> {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.dispatcher
            .send_message(DispatcherMessage::GetStats { reply: tx.into() })
            .map_err(|_| EngineError::ShuttingDown)?;
        rx.await.map_err(|_| EngineError::ShuttingDown)
    }

    /// Wait until a job reaches a terminal status.
    ///
    /// Returns `Ok(None)` for an unknown identifier and `Timeout` if the job
    /// is still queued or processing when `timeout` elapses.
    pub async fn wait_for_settled(
        &self,
        job_id: &JobId,
        timeout: Duration,
    ) -> Result<Option<JobStatus>, EngineError> {
        let deadline = tokio::time::Instant::now() + timeout;
        // Subscribe before the first check so no transition slips between them.
        let mut events = self.event_tx.subscribe();

        loop {
            match self.store.status(job_id) {
                None => return Ok(None),
                Some(status) if status.is_terminal() => return Ok(Some(status)),
                Some(_) => {}
            }

            // Only a job settling can change the answer; a lag may hide one.
            loop {
                match tokio::time::timeout_at(deadline, events.recv()).await {
                    Err(_) => return Err(EngineError::Timeout),
                    Ok(Ok(event)) if event.is_terminal() => break,
                    Ok(Ok(_)) => {}
                    Ok(Err(RecvError::Lagged(_))) => break,
                    Ok(Err(RecvError::Closed)) => return Err(EngineError::ShuttingDown),
                }
            }
        }
    }

    /// Stop accepting work and stop the actors.
    ///
    /// Jobs still queued stay `QUEUED`; nothing resumes them.
    pub fn shutdown(&self) {
        if self.accepting.swap(false, Ordering::SeqCst) {
            tracing::info!("Shutting down order engine");
            let _ = self.dispatcher.send_message(DispatcherMessage::Shutdown);
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}

/// Start the engine with the given configuration and processor.
///
/// The returned handle completes when the dispatcher stops.
pub async fn start_engine(
    config: EngineConfig,
    processor: impl OrderProcessor,
) -> Result<(OrderEngine, JoinHandle<()>), EngineError> {
    config.validate()?;
    tracing::info!(
        "Starting order engine: {} workers, processor {}",
        config.workers,
        processor.name()
    );

    let (event_tx, _) = broadcast::channel(config.event_capacity);
    let store = Arc::new(JobStore::new());
    let backlog = Arc::new(AtomicUsize::new(0));
    let max_pending = config.max_pending;

    let args = DispatcherArgs {
        config,
        store: store.clone(),
        processor: Arc::new(processor),
        event_tx: event_tx.clone(),
        backlog: backlog.clone(),
    };
    let (dispatcher, handle) = Actor::spawn(None, Dispatcher, args)
        .await
        .map_err(|e| EngineError::Spawn(e.to_string()))?;

    let engine = OrderEngine {
        store,
        dispatcher,
        event_tx,
        backlog,
        accepting: Arc::new(AtomicBool::new(true)),
        max_pending,
    };
    Ok((engine, handle))
}
