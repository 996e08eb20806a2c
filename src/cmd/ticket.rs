use std::sync::Arc;

use crate::context::AppContext;
use crate::domain::employee::Employee;
use crate::domain::filter::FilterCriteria;
use crate::domain::status::{Priority, TicketStatus, Transition};
use crate::domain::ticket::{Ticket, TicketId};
use crate::error::{AppError, AppResult};
use crate::services::{CollectionSource, StatusEndpoint};
use crate::workflow::board::{Board, BoardState};
use crate::workflow::loader::RemoteCollectionLoader;

#[derive(Debug, Clone, Default)]
pub struct ListCommandArgs {
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub search: Option<String>,
}

pub struct BoardSnapshot {
    pub ready: bool,
    pub visible: Vec<Ticket>,
}

pub struct StatusOutcome {
    pub updated: bool,
    pub board: BoardSnapshot,
}

pub fn parse_priority(value: Option<&str>) -> AppResult<Option<Priority>> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => Priority::from_str(value)
            .map(Some)
            .ok_or_else(|| AppError::InvalidInput(format!("unknown priority '{value}'"))),
    }
}

/// Loads the board once and applies the given filters.
pub async fn list(ctx: &AppContext, args: ListCommandArgs) -> AppResult<BoardSnapshot> {
    let criteria = FilterCriteria::default()
        .with_priority(parse_priority(args.priority.as_deref())?)
        .with_search(args.search.unwrap_or_default().to_lowercase());
    let mut board = Board::from_context(ctx, BoardState::new(criteria));
    board.synced().await;

    if let Some(assignee) = args.assignee.as_deref() {
        board.set_assignee(assignee)?;
    }

    Ok(snapshot(&board))
}

/// Loads only the employee list; the ticket feed is never requested.
pub async fn employees(ctx: &AppContext) -> AppResult<Vec<Employee>> {
    load_employees(Arc::new(ctx.cms.employees())).await
}

async fn load_employees(source: Arc<dyn CollectionSource<Employee>>) -> AppResult<Vec<Employee>> {
    let loader = RemoteCollectionLoader::once(source);
    let employees = loader.wait_for_fetches(1).await;
    if !employees.ready {
        return Err(AppError::Transport(
            "employee list could not be loaded".to_string(),
        ));
    }
    Ok(employees.items.as_ref().clone())
}

/// Changes a ticket's status through the board and returns the list after
/// the triggered re-fetch.
pub async fn transition(
    ctx: &AppContext,
    transition: Transition,
    id: TicketId,
) -> AppResult<StatusOutcome> {
    let mut board = Board::from_context(ctx, BoardState::default());
    board.synced().await;

    let updated = board.update_status(transition, &id).await;
    if updated {
        board.synced().await;
    }

    Ok(StatusOutcome {
        updated,
        board: snapshot(&board),
    })
}

/// Administrative reopen. Goes straight to the status endpoint.
pub async fn reopen(ctx: &AppContext, id: TicketId) -> AppResult<String> {
    ctx.cms.set_status(TicketStatus::Open, &id).await
}

fn snapshot(board: &Board) -> BoardSnapshot {
    BoardSnapshot {
        ready: board.tickets().ready,
        visible: board.visible(),
    }
}
