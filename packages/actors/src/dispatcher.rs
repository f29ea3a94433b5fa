//! Dispatcher actor: FIFO hand-off of queued jobs to the worker pool.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use order_core::{EngineConfig, EngineStats, JobEvent, JobState};
use ractor::{Actor, ActorId, ActorProcessingErr, ActorRef, SupervisionEvent};
use store::{JobStore, RetentionPolicy};
use tokio::sync::broadcast;

use crate::messages::{DispatcherMessage, WorkItem, WorkerMessage};
use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::processor::OrderProcessor;
use crate::worker_actor::{WorkerActor, WorkerArgs};

/// Reason recorded for a job whose worker died mid-run.
const WORKER_LOST: &str = "Worker stopped unexpectedly";

/// Dispatcher arguments.
pub struct DispatcherArgs {
    pub config: EngineConfig,
    pub store: Arc<JobStore>,
    pub processor: Arc<dyn OrderProcessor>,
    pub event_tx: broadcast::Sender<JobEvent>,
    /// Jobs accepted but not yet handed to a worker.
    pub backlog: Arc<AtomicUsize>,
}

/// One worker in the pool.
struct WorkerSlot {
    worker_id: String,
    actor: ActorRef<WorkerMessage>,
    /// Job handed to this worker and not yet reported back.
    current: Option<WorkItem>,
}

/// State for the dispatcher.
pub struct DispatcherState {
    /// Jobs waiting for a worker, oldest first.
    pending: VecDeque<WorkItem>,
    workers: HashMap<ActorId, WorkerSlot>,
    idle: VecDeque<ActorId>,
    stats: EngineStats,
    retention: RetentionPolicy,
    store: Arc<JobStore>,
    pipeline: Arc<Pipeline>,
    event_tx: broadcast::Sender<JobEvent>,
    backlog: Arc<AtomicUsize>,
    /// Worker counter for unique IDs.
    worker_counter: u64,
    stopping: bool,
}

impl DispatcherState {
    fn new(
        config: &EngineConfig,
        store: Arc<JobStore>,
        pipeline: Arc<Pipeline>,
        event_tx: broadcast::Sender<JobEvent>,
        backlog: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            pending: VecDeque::new(),
            workers: HashMap::new(),
            idle: VecDeque::new(),
            stats: EngineStats::default(),
            retention: RetentionPolicy::from_config(config),
            store,
            pipeline,
            event_tx,
            backlog,
            worker_counter: 0,
            stopping: false,
        }
    }

    fn next_worker_id(&mut self) -> String {
        self.worker_counter += 1;
        format!("worker-{}", self.worker_counter)
    }

    fn broadcast(&self, event: JobEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Queue accepted work, or drop it once shutdown has begun.
    fn enqueue(&mut self, work: WorkItem) {
        if self.stopping {
            tracing::warn!("Abandoning job {} received during shutdown", work.job_id);
            self.backlog.fetch_sub(1, Ordering::SeqCst);
            return;
        }
        self.pending.push_back(work);
        self.assign();
    }

    /// Hand pending jobs to idle workers until one side runs out.
    fn assign(&mut self) {
        while !self.pending.is_empty() {
            let Some(actor_id) = self.idle.pop_front() else {
                break;
            };
            let Some(slot) = self.workers.get_mut(&actor_id) else {
                continue;
            };
            let Some(work) = self.pending.pop_front() else {
                break;
            };

            let message = WorkerMessage::Process {
                work: Box::new(work.clone()),
            };
            match slot.actor.send_message(message) {
                Ok(()) => {
                    tracing::debug!("Dispatched job {} to {}", work.job_id, slot.worker_id);
                    slot.current = Some(work);
                    self.backlog.fetch_sub(1, Ordering::SeqCst);
                }
                Err(e) => {
                    // The supervision event for this worker will follow.
                    tracing::warn!("Worker {} refused job {}: {}", slot.worker_id, work.job_id, e);
                    self.pending.push_front(work);
                }
            }
        }
    }

    fn record(&mut self, outcome: PipelineOutcome) {
        match outcome {
            PipelineOutcome::Completed { duration_ms } => {
                self.stats.completed += 1;
                self.stats.record_duration(duration_ms);
            }
            PipelineOutcome::Failed { duration_ms } => {
                self.stats.failed += 1;
                self.stats.record_duration(duration_ms);
            }
            PipelineOutcome::Skipped => {}
        }
    }

    /// Settle the job a dead worker was holding.
    fn recover(&mut self, work: WorkItem) {
        let job_id = work.job_id;
        match self.store.state(&job_id) {
            // Never started, so it can go to the next worker.
            Some(JobState::Queued { .. }) => {
                tracing::warn!("Requeueing job {} from a lost worker", job_id);
                self.backlog.fetch_add(1, Ordering::SeqCst);
                self.pending.push_front(work);
            }
            Some(JobState::Processing {
                queued_at,
                started_at,
                ..
            }) => {
                let failed_at = Utc::now();
                let failed = JobState::Failed {
                    queued_at,
                    started_at,
                    failed_at,
                    reason: WORKER_LOST.to_string(),
                };
                if self.store.transition(job_id, failed).is_ok() {
                    // No duration: the run never reported back.
                    self.stats.failed += 1;
                    let event = JobEvent::JobFailed {
                        job_id,
                        reason: WORKER_LOST.to_string(),
                        timestamp: failed_at,
                    };
                    tracing::warn!("{}", event.description());
                    self.broadcast(event);
                }
            }
            _ => {}
        }
    }

    fn snapshot(&self) -> EngineStats {
        EngineStats {
            queued: self.pending.len() as u64,
            processing: self
                .workers
                .values()
                .filter(|slot| slot.current.is_some())
                .count() as u64,
            workers: self.workers.len() as u32,
            ..self.stats.clone()
        }
    }
}

async fn spawn_worker(
    myself: &ActorRef<DispatcherMessage>,
    state: &mut DispatcherState,
) -> Result<(), ActorProcessingErr> {
    let worker_id = state.next_worker_id();
    let args = WorkerArgs {
        worker_id: worker_id.clone(),
        dispatcher: myself.clone(),
        pipeline: state.pipeline.clone(),
        event_tx: state.event_tx.clone(),
    };

    let (actor, _handle) = Actor::spawn_linked(None, WorkerActor, args, myself.get_cell())
        .await
        .map_err(|e| ActorProcessingErr::from(format!("Failed to spawn worker: {}", e)))?;

    let actor_id = actor.get_id();
    state.workers.insert(
        actor_id,
        WorkerSlot {
            worker_id,
            actor,
            current: None,
        },
    );
    state.idle.push_back(actor_id);
    Ok(())
}

/// Dispatcher actor that owns the pending queue and the worker pool.
pub struct Dispatcher;

impl Actor for Dispatcher {
    type Msg = DispatcherMessage;
    type State = DispatcherState;
    type Arguments = DispatcherArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting dispatcher with {} workers", args.config.workers);

        let pipeline = Pipeline::new(
            args.store.clone(),
            args.processor,
            args.event_tx.clone(),
            args.config.process_timeout(),
        );
        let mut state = DispatcherState::new(
            &args.config,
            args.store,
            Arc::new(pipeline),
            args.event_tx,
            args.backlog,
        );

        for _ in 0..args.config.workers {
            spawn_worker(&myself, &mut state).await?;
        }

        // Start periodic tick
        let period = args.config.housekeeping_interval();
        let myself_clone = myself.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if myself_clone.send_message(DispatcherMessage::Tick).is_err() {
                    break;
                }
            }
        });

        Ok(state)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DispatcherMessage::Dispatch { work } => {
                state.enqueue(*work);
            }

            DispatcherMessage::JobFinished {
                worker,
                job_id,
                outcome,
            } => {
                state.record(outcome);

                if let Some(slot) = state.workers.get_mut(&worker) {
                    if slot.current.as_ref().is_some_and(|w| w.job_id == job_id) {
                        slot.current = None;
                    }
                    if !state.stopping {
                        state.idle.push_back(worker);
                        state.assign();
                    }
                }
            }

            DispatcherMessage::GetStats { reply } => {
                let _ = reply.send(state.snapshot());
            }

            DispatcherMessage::Shutdown => {
                tracing::info!("Shutting down dispatcher");
                state.stopping = true;

                let in_flight = state
                    .workers
                    .values()
                    .filter(|slot| slot.current.is_some())
                    .count();
                if !state.pending.is_empty() || in_flight > 0 {
                    tracing::warn!(
                        "Abandoning {} queued and {} in-flight jobs",
                        state.pending.len(),
                        in_flight
                    );
                }

                for slot in state.workers.values() {
                    let _ = slot.actor.send_message(WorkerMessage::Shutdown);
                }
                myself.stop(None);
                return Ok(());
            }

            DispatcherMessage::Tick => {
                if !state.retention.is_enabled() {
                    return Ok(());
                }
                let evicted = state.retention.apply(&state.store, Utc::now());
                if !evicted.is_empty() {
                    let event = JobEvent::JobsEvicted {
                        count: evicted.len(),
                        timestamp: Utc::now(),
                    };
                    tracing::info!("{}", event.description());
                    state.broadcast(event);
                }
            }
        }

        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let (cell, reason) = match message {
            SupervisionEvent::ActorTerminated(cell, _, reason) => {
                (cell, reason.unwrap_or_else(|| "stopped".into()))
            }
            SupervisionEvent::ActorFailed(cell, err) => (cell, err.to_string()),
            _ => return Ok(()),
        };

        let actor_id = cell.get_id();
        let Some(slot) = state.workers.remove(&actor_id) else {
            return Ok(());
        };
        state.idle.retain(|id| *id != actor_id);

        if state.stopping {
            tracing::debug!("Worker {} exited during shutdown", slot.worker_id);
            return Ok(());
        }

        tracing::warn!("Worker {} terminated: {}", slot.worker_id, reason);
        if let Some(work) = slot.current {
            state.recover(work);
        }

        spawn_worker(&myself, state).await?;
        state.assign();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::processor::PricingProcessor;
    use order_core::{JobId, OrderRequest};

    fn idle_state(backlog: usize) -> DispatcherState {
        let store = Arc::new(JobStore::new());
        let (tx, _) = broadcast::channel(16);
        let pipeline = Pipeline::new(
            store.clone(),
            Arc::new(PricingProcessor),
            tx.clone(),
            Duration::from_secs(5),
        );
        DispatcherState::new(
            &EngineConfig::default(),
            store,
            Arc::new(pipeline),
            tx,
            Arc::new(AtomicUsize::new(backlog)),
        )
    }

    fn queued_work(store: &JobStore) -> WorkItem {
        let job_id = JobId::new();
        let queued_at = Utc::now();
        store.insert_queued(job_id, queued_at).unwrap();
        WorkItem {
            job_id,
            request: OrderRequest::new("cust-1", "widget", 1, 1.0),
            queued_at,
        }
    }

    #[test]
    fn work_waits_for_an_idle_worker() {
        let mut state = idle_state(1);
        let work = queued_work(&state.store);
        state.enqueue(work);
        assert_eq!(state.pending.len(), 1);
        assert_eq!(state.backlog.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn work_arriving_during_shutdown_is_abandoned() {
        let mut state = idle_state(1);
        state.stopping = true;
        let work = queued_work(&state.store);
        let job_id = work.job_id;

        state.enqueue(work);
        assert!(state.pending.is_empty());
        assert_eq!(state.backlog.load(Ordering::SeqCst), 0);
        assert_eq!(state.store.status(&job_id), Some(order_core::JobStatus::Queued));
    }

    #[test]
    fn lost_job_does_not_skew_average_duration() {
        let mut state = idle_state(0);
        state.record(PipelineOutcome::Completed { duration_ms: 10 });

        let work = queued_work(&state.store);
        state
            .store
            .transition(
                work.job_id,
                JobState::Processing {
                    queued_at: work.queued_at,
                    started_at: Utc::now(),
                    worker_id: "worker-1".into(),
                },
            )
            .unwrap();
        state.recover(work);

        state.record(PipelineOutcome::Completed { duration_ms: 40 });

        let stats = state.snapshot();
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.avg_duration_ms, Some(25.0));
    }
}
