use crate::db::{DeleteBatch, UrlStorage};
use crate::error::ShortenerError;

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use tracing::{debug, error, info};

/// Messages handled by the deletion actor.
#[derive(Debug)]
pub enum DeletionMessage {
    /// Soft-delete a batch of short codes owned by one user. Fire-and-forget.
    Delete(DeleteBatch),
    /// Reply once every earlier message has been processed.
    Flush(RpcReplyPort<()>),
}

/// Handle for submitting deletions to the actor.
#[derive(Clone)]
pub struct DeletionHandle {
    actor: ActorRef<DeletionMessage>,
}

impl DeletionHandle {
    /// Accept a batch for deletion. Returns as soon as the batch is queued;
    /// the outcome is only visible through later reads or the logs.
    pub fn submit(&self, owner: impl Into<String>, shorts: Vec<String>) -> Result<(), ShortenerError> {
        let batch = DeleteBatch {
            owner: owner.into(),
            shorts,
        };
        ractor::cast!(self.actor, DeletionMessage::Delete(batch))
            .map_err(|e| ShortenerError::RactorError(format!("Delete cast failed: {e}")))
    }

    /// Wait until everything submitted so far has been applied (or has failed).
    pub async fn flush(&self) -> Result<(), ShortenerError> {
        ractor::call!(self.actor, DeletionMessage::Flush)
            .map_err(|e| ShortenerError::RactorError(format!("Flush RPC failed: {e}")))
    }

    pub fn stop(&self) {
        self.actor.stop(Some("shutdown".to_string()));
    }
}

struct DeletionActorState {
    urls: UrlStorage,
}

/// ractor-based deletion actor; applies batches one at a time in arrival order.
struct DeletionActor;

#[ractor::async_trait]
impl Actor for DeletionActor {
    type Msg = DeletionMessage;
    type State = DeletionActorState;
    type Arguments = UrlStorage;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        urls: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        info!("DeletionActor started");
        Ok(DeletionActorState { urls })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DeletionMessage::Delete(batch) => {
                self.handle_delete(state, batch).await;
            }
            DeletionMessage::Flush(reply) => {
                let _ = reply.send(());
            }
        }
        Ok(())
    }
}

impl DeletionActor {
    async fn handle_delete(&self, state: &mut DeletionActorState, batch: DeleteBatch) {
        let requested = batch.shorts.len();
        // failures stay here; the submitter already got its acknowledgement
        match state.urls.batch_soft_delete(&batch).await {
            Ok(flipped) => {
                debug!(
                    owner = %batch.owner,
                    requested,
                    flipped,
                    "batch soft-delete applied"
                );
            }
            Err(e) => {
                error!(
                    owner = %batch.owner,
                    requested,
                    error = %e,
                    "batch soft-delete failed"
                );
            }
        }
    }
}

/// Spawn the deletion actor over `urls` and return a handle.
pub async fn spawn(urls: UrlStorage) -> Result<DeletionHandle, ShortenerError> {
    let (actor, _jh) = Actor::spawn(None, DeletionActor, urls)
        .await
        .map_err(|e| ShortenerError::RactorError(format!("spawn DeletionActor failed: {e}")))?;
    Ok(DeletionHandle { actor })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Repositories;
    use std::time::Duration;

    #[tokio::test]
    async fn submitted_batch_is_applied_after_flush() {
        let repos = Repositories::in_memory(Duration::from_secs(5)).await.unwrap();
        repos.urls.create("zzzzz", "https://y.com", "u1").await.unwrap();
        repos.urls.create("yyyyy", "https://other.com", "u2").await.unwrap();

        let handle = spawn(repos.urls.clone()).await.unwrap();
        handle
            .submit("u1", vec!["zzzzz".to_string(), "yyyyy".to_string()])
            .unwrap();
        handle.flush().await.unwrap();

        assert!(matches!(repos.urls.resolve("zzzzz").await, Err(ShortenerError::Gone)));
        assert_eq!(repos.urls.resolve("yyyyy").await.unwrap(), "https://other.com");
        handle.stop();
    }

    #[tokio::test]
    async fn storage_failure_does_not_kill_the_actor() {
        let repos = Repositories::in_memory(Duration::from_secs(5)).await.unwrap();
        let handle = spawn(repos.urls.clone()).await.unwrap();
        repos.pool().close().await;

        handle.submit("u1", vec!["abcde".to_string()]).unwrap();
        handle.flush().await.unwrap();
        handle.submit("u1", vec!["fghij".to_string()]).unwrap();
        handle.flush().await.unwrap();
        handle.stop();
    }
}
