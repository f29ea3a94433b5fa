//! Worker actor for running the pipeline step.

use std::sync::Arc;

use chrono::Utc;
use order_core::JobEvent;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::broadcast;

use crate::messages::{DispatcherMessage, WorkerMessage};
use crate::pipeline::Pipeline;

/// State for the worker actor.
pub struct WorkerActorState {
    /// Unique worker ID.
    pub worker_id: String,
    /// Dispatcher to report back to.
    dispatcher: ActorRef<DispatcherMessage>,
    pipeline: Arc<Pipeline>,
    event_tx: broadcast::Sender<JobEvent>,
}

/// Worker actor arguments.
pub struct WorkerArgs {
    pub worker_id: String,
    pub dispatcher: ActorRef<DispatcherMessage>,
    pub pipeline: Arc<Pipeline>,
    pub event_tx: broadcast::Sender<JobEvent>,
}

/// Worker actor that processes one job at a time.
pub struct WorkerActor;

impl Actor for WorkerActor {
    type Msg = WorkerMessage;
    type State = WorkerActorState;
    type Arguments = WorkerArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting worker: {}", args.worker_id);

        let _ = args.event_tx.send(JobEvent::WorkerStarted {
            worker_id: args.worker_id.clone(),
            timestamp: Utc::now(),
        });

        Ok(WorkerActorState {
            worker_id: args.worker_id,
            dispatcher: args.dispatcher,
            pipeline: args.pipeline,
            event_tx: args.event_tx,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::Process { work } => {
                let job_id = work.job_id;
                let outcome = state.pipeline.run(&state.worker_id, *work).await;

                if state
                    .dispatcher
                    .send_message(DispatcherMessage::JobFinished {
                        worker: myself.get_id(),
                        job_id,
                        outcome,
                    })
                    .is_err()
                {
                    // Dispatcher is gone, nothing left to work for.
                    myself.stop(None);
                }
            }

            WorkerMessage::Shutdown => {
                tracing::info!("Shutting down worker: {}", state.worker_id);
                myself.stop(None);
            }
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        tracing::debug!("Worker {} stopped", state.worker_id);
        let _ = state.event_tx.send(JobEvent::WorkerStopped {
            worker_id: state.worker_id.clone(),
            timestamp: Utc::now(),
        });
        Ok(())
    }
}
