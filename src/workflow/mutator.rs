use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{error, info};

use crate::domain::refresh::RefreshKey;
use crate::domain::status::Transition;
use crate::domain::ticket::TicketId;
use crate::services::StatusEndpoint;

/// Sends status changes to the backend. A successful change yields the
/// refresh key the board stores to re-sync the ticket list.
pub struct StatusMutator {
    endpoint: Arc<dyn StatusEndpoint>,
    successes: AtomicU64,
}

impl StatusMutator {
    pub fn new(endpoint: Arc<dyn StatusEndpoint>) -> Self {
        Self {
            endpoint,
            successes: AtomicU64::new(0),
        }
    }

    /// Issues exactly one remote call. Failures are logged and reported as
    /// `None`; nothing local changes in that case.
    pub async fn mutate(&self, transition: Transition, id: &TicketId) -> Option<RefreshKey> {
        let status = transition.target();
        match self.endpoint.set_status(status, id).await {
            Ok(confirmation) => {
                let sequence = self.successes.fetch_add(1, Ordering::SeqCst) + 1;
                info!(status = %status, id = %id, "new status: {confirmation}");
                Some(RefreshKey::after_mutation(status, id, sequence))
            }
            Err(err) => {
                error!(status = %status, id = %id, "status update failed: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::status::TicketStatus;
    use crate::error::{AppError, AppResult};

    #[derive(Default)]
    struct RecordingEndpoint {
        calls: Mutex<Vec<(TicketStatus, TicketId)>>,
        reject: bool,
    }

    #[async_trait]
    impl StatusEndpoint for RecordingEndpoint {
        async fn set_status(&self, status: TicketStatus, id: &TicketId) -> AppResult<String> {
            self.calls.lock().unwrap().push((status, id.clone()));
            if self.reject {
                Err(AppError::Rejected("Action not allowed".to_string()))
            } else {
                Ok(format!("Ticket status set to {status} for page ID {id}"))
            }
        }
    }

    #[tokio::test]
    async fn success_produces_status_and_id_key() {
        let endpoint = Arc::new(RecordingEndpoint::default());
        let mutator = StatusMutator::new(endpoint.clone());

        let key = mutator
            .mutate(Transition::Close, &TicketId::from(42))
            .await
            .unwrap();

        assert_eq!(key.label(), "closed42");
        assert_eq!(
            *endpoint.calls.lock().unwrap(),
            vec![(TicketStatus::Closed, TicketId::from(42))]
        );
    }

    #[tokio::test]
    async fn failure_produces_no_key() {
        let endpoint = Arc::new(RecordingEndpoint {
            reject: true,
            ..Default::default()
        });
        let mutator = StatusMutator::new(endpoint.clone());

        let key = mutator
            .mutate(Transition::StartProgress, &TicketId::from(5))
            .await;

        assert!(key.is_none());
        assert_eq!(endpoint.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn identical_mutations_yield_distinct_keys() {
        let mutator = StatusMutator::new(Arc::new(RecordingEndpoint::default()));
        let id = TicketId::from(3);

        let first = mutator.mutate(Transition::Close, &id).await.unwrap();
        let second = mutator.mutate(Transition::Close, &id).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(second.sequence(), 2);
    }
}
