use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::employee::Employee;
use crate::domain::ticket::{Ticket, TicketId};
use crate::error::{AppError, AppResult};
use crate::infra::store::{AuthorityOutcome, TicketStore};

type SharedStore = Arc<RwLock<TicketStore>>;

/// Routes of the CMS surface the board talks to.
pub fn build_router(store: SharedStore) -> Router {
    Router::new()
        .route("/tickets/", get(tickets_handler))
        .route("/mitarbeiter/", get(employees_handler))
        .route("/api/{action}/{id}/", get(status_handler))
        .with_state(store)
}

/// Serves `store` on `addr` until Ctrl-C.
pub async fn serve(addr: SocketAddr, store: TicketStore) -> AppResult<()> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!(%local, "development backend listening");

    let app = build_router(Arc::new(RwLock::new(store)));
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(|err| AppError::Transport(format!("development backend failed: {err}")))
}

async fn tickets_handler(State(store): State<SharedStore>) -> Json<Vec<Ticket>> {
    Json(store.read().await.feed())
}

async fn employees_handler(State(store): State<SharedStore>) -> Json<Vec<Employee>> {
    Json(store.read().await.employees().to_vec())
}

async fn status_handler(
    State(store): State<SharedStore>,
    Path((action, id)): Path<(String, String)>,
) -> (StatusCode, String) {
    let id = TicketId::new(id);
    let outcome = store.write().await.apply(&action, &id);

    match outcome {
        AuthorityOutcome::Updated(confirmation) => {
            let title = store
                .read()
                .await
                .get(&id)
                .map(|ticket| ticket.title.clone())
                .unwrap_or_default();
            info!(%action, %id, %title, "status updated");
            (StatusCode::OK, confirmation)
        }
        AuthorityOutcome::UnknownId => {
            warn!(%action, %id, "no ticket with this id");
            (StatusCode::OK, String::new())
        }
        AuthorityOutcome::UnknownAction(action) => {
            warn!(%action, %id, "action rejected");
            (
                StatusCode::BAD_REQUEST,
                format!("Action: {action} not allowed"),
            )
        }
    }
}
