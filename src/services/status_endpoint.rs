use async_trait::async_trait;

use crate::domain::status::TicketStatus;
use crate::domain::ticket::TicketId;
use crate::error::AppResult;

#[async_trait]
pub trait StatusEndpoint: Send + Sync {
    /// Asks the backend to overwrite the ticket's status. Returns the
    /// confirmation text on success.
    async fn set_status(&self, status: TicketStatus, id: &TicketId) -> AppResult<String>;
}
