use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::context::AppContext;
use crate::domain::employee::Employee;
use crate::domain::filter::FilterCriteria;
use crate::domain::refresh::RefreshKey;
use crate::domain::status::{Priority, Transition};
use crate::domain::ticket::{Ticket, TicketId};
use crate::error::{AppError, AppResult};
use crate::services::{CollectionSource, StatusEndpoint};
use crate::workflow::loader::{LoadState, RemoteCollectionLoader, StalePolicy};
use crate::workflow::mutator::StatusMutator;

/// Session state owned by the board: the filter criteria and the refresh key.
/// Loaders only ever see the key through a receiver, and every stored key
/// reaches each of them.
pub struct BoardState {
    criteria: FilterCriteria,
    refresh: RefreshKey,
    listeners: Vec<mpsc::UnboundedSender<RefreshKey>>,
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new(FilterCriteria::default())
    }
}

impl BoardState {
    pub fn new(criteria: FilterCriteria) -> Self {
        Self {
            criteria,
            refresh: RefreshKey::default(),
            listeners: Vec::new(),
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn refresh_key(&self) -> RefreshKey {
        self.refresh.clone()
    }

    fn watch_refresh(&mut self) -> mpsc::UnboundedReceiver<RefreshKey> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.push(tx);
        rx
    }

    fn store_refresh_key(&mut self, key: RefreshKey) {
        self.listeners.retain(|listener| listener.send(key.clone()).is_ok());
        self.refresh = key;
    }
}

pub struct Board {
    state: BoardState,
    tickets: RemoteCollectionLoader<Ticket>,
    employees: RemoteCollectionLoader<Employee>,
    mutator: Arc<StatusMutator>,
}

impl Board {
    pub fn new(
        mut state: BoardState,
        tickets: Arc<dyn CollectionSource<Ticket>>,
        employees: Arc<dyn CollectionSource<Employee>>,
        endpoint: Arc<dyn StatusEndpoint>,
        policy: StalePolicy,
    ) -> Self {
        let tickets = RemoteCollectionLoader::spawn(tickets, state.watch_refresh(), policy);
        let employees = RemoteCollectionLoader::once(employees);
        Self {
            state,
            tickets,
            employees,
            mutator: Arc::new(StatusMutator::new(endpoint)),
        }
    }

    pub fn from_context(ctx: &AppContext, state: BoardState) -> Self {
        Self::new(
            state,
            Arc::new(ctx.cms.tickets()),
            Arc::new(ctx.cms.employees()),
            Arc::new(ctx.cms.clone()),
            StalePolicy::from_flag(ctx.config.discard_stale_responses),
        )
    }

    pub fn criteria(&self) -> &FilterCriteria {
        self.state.criteria()
    }

    pub fn refresh_key(&self) -> RefreshKey {
        self.state.refresh_key()
    }

    pub fn set_priority(&mut self, priority: Option<Priority>) {
        self.state.criteria.priority = priority.map(|p| p.tag().to_string()).unwrap_or_default();
    }

    /// Clears the priority and the assignee filter together.
    pub fn show_all(&mut self) {
        self.state.criteria.priority.clear();
        self.state.criteria.assignee.clear();
    }

    /// Restricts the board to one employee. Once the employee list is
    /// loaded, only names from it are accepted.
    pub fn set_assignee(&mut self, name: &str) -> AppResult<()> {
        let name = name.trim();
        let employees = self.employees.snapshot();
        if !name.is_empty()
            && employees.ready
            && !employees.items.iter().any(|employee| employee.title == name)
        {
            return Err(AppError::InvalidInput(format!("unknown employee '{name}'")));
        }
        self.state.criteria.assignee = name.to_string();
        Ok(())
    }

    pub fn set_search(&mut self, text: &str) {
        self.state.criteria.search = text.to_lowercase();
    }

    pub fn tickets(&self) -> LoadState<Ticket> {
        self.tickets.snapshot()
    }

    pub fn employees(&self) -> LoadState<Employee> {
        self.employees.snapshot()
    }

    pub fn subscribe_tickets(&self) -> watch::Receiver<LoadState<Ticket>> {
        self.tickets.subscribe()
    }

    pub fn visible(&self) -> Vec<Ticket> {
        self.state.criteria.apply(&self.tickets.items())
    }

    /// Handle for running a status change without holding the board.
    /// Feed its result back through [`Board::record_mutation`].
    pub fn mutator(&self) -> Arc<StatusMutator> {
        Arc::clone(&self.mutator)
    }

    /// Runs a status change and records its result.
    pub async fn update_status(&mut self, transition: Transition, id: &TicketId) -> bool {
        let key = self.mutator.mutate(transition, id).await;
        self.record_mutation(key, id)
    }

    /// Stores the refresh key of a successful mutation, which schedules one
    /// ticket re-fetch. Returns whether there was one.
    pub fn record_mutation(&mut self, key: Option<RefreshKey>, id: &TicketId) -> bool {
        match key {
            Some(key) => {
                debug!(key = key.label(), sequence = key.sequence(), "storing refresh key");
                self.state.store_refresh_key(key);
                true
            }
            None => {
                warn!(id = %id, "status unchanged, board not refreshed");
                false
            }
        }
    }

    /// Waits until the employee list and the ticket fetch for the current
    /// refresh key have resolved.
    pub async fn synced(&self) {
        self.employees.wait_for_fetches(1).await;
        self.tickets.wait_for_key(&self.state.refresh_key()).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::infra::cms::CmsClient;

    fn sample_tickets() -> serde_json::Value {
        json!([
            {"id": 1, "date": "2024-07-08 15:44:59", "status": "open",
             "priority": "priority-high", "title": "A", "aufgabe": "do X",
             "zugewiesen": "Alice"},
            {"id": 2, "date": "2024-07-09 09:00:00", "status": "in-progress",
             "priority": "priority-low", "title": "B", "aufgabe": "do Y",
             "zugewiesen": ""}
        ])
    }

    async fn mount_employees(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/mitarbeiter/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 10, "title": "Alice"},
                {"id": 11, "title": "Bob"}
            ])))
            .mount(server)
            .await;
    }

    fn board(server: &MockServer) -> Board {
        let cms = CmsClient::new(&server.uri(), Some(Duration::from_secs(5))).unwrap();
        Board::new(
            BoardState::default(),
            Arc::new(cms.tickets()),
            Arc::new(cms.employees()),
            Arc::new(cms),
            StalePolicy::default(),
        )
    }

    fn ids(tickets: &[Ticket]) -> Vec<&str> {
        tickets.iter().map(|t| t.id.as_str()).collect()
    }

    #[tokio::test]
    async fn filters_apply_to_loaded_tickets() {
        let server = MockServer::start().await;
        mount_employees(&server).await;
        Mock::given(method("GET"))
            .and(path("/tickets/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_tickets()))
            .expect(1)
            .mount(&server)
            .await;

        let mut board = board(&server);
        board.synced().await;
        assert_eq!(ids(&board.visible()), vec!["1", "2"]);

        board.set_priority(Some(Priority::High));
        assert_eq!(ids(&board.visible()), vec!["1"]);

        board.show_all();
        board.set_search("Do Y");
        assert_eq!(ids(&board.visible()), vec!["2"]);

        board.set_search("");
        board.set_assignee("Alice").unwrap();
        assert_eq!(ids(&board.visible()), vec!["1"]);
    }

    #[tokio::test]
    async fn show_all_clears_priority_and_assignee() {
        let server = MockServer::start().await;
        mount_employees(&server).await;
        Mock::given(method("GET"))
            .and(path("/tickets/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_tickets()))
            .mount(&server)
            .await;

        let mut board = board(&server);
        board.synced().await;
        board.set_priority(Some(Priority::Low));
        board.set_assignee("Bob").unwrap();
        board.set_search("b");
        board.show_all();

        assert_eq!(board.criteria().priority, "");
        assert_eq!(board.criteria().assignee, "");
        assert_eq!(board.criteria().search, "b");
    }

    #[tokio::test]
    async fn rejects_unknown_assignee_once_employees_are_loaded() {
        let server = MockServer::start().await;
        mount_employees(&server).await;
        Mock::given(method("GET"))
            .and(path("/tickets/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_tickets()))
            .mount(&server)
            .await;

        let mut board = board(&server);
        board.synced().await;

        assert!(matches!(
            board.set_assignee("Mallory"),
            Err(AppError::InvalidInput(_))
        ));
        assert_eq!(board.criteria().assignee, "");
        assert_eq!(board.employees().items.len(), 2);
    }

    #[tokio::test]
    async fn successful_close_refetches_exactly_once() {
        let server = MockServer::start().await;
        mount_employees(&server).await;
        Mock::given(method("GET"))
            .and(path("/tickets/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_tickets()))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tickets/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "date": "2024-07-08 15:44:59", "status": "open",
                 "priority": "priority-high", "title": "A", "aufgabe": "do X",
                 "zugewiesen": "Alice"}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/closed/2/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("Ticket status set to closed for page ID 2"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut board = board(&server);
        board.synced().await;
        assert_eq!(ids(&board.visible()), vec!["1", "2"]);

        assert!(board.update_status(Transition::Close, &TicketId::from(2)).await);
        assert_eq!(board.refresh_key().label(), "closed2");

        board.synced().await;
        assert_eq!(ids(&board.visible()), vec!["1"]);
        assert_eq!(board.tickets().fetches_completed, 2);
    }

    #[tokio::test]
    async fn back_to_back_mutations_refetch_once_each() {
        let server = MockServer::start().await;
        mount_employees(&server).await;
        Mock::given(method("GET"))
            .and(path("/tickets/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_tickets()))
            .expect(3)
            .mount(&server)
            .await;
        for id in ["1", "2"] {
            Mock::given(method("GET"))
                .and(path(format!("/api/closed/{id}/")))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(format!("Ticket status set to closed for page ID {id}")),
                )
                .expect(1)
                .mount(&server)
                .await;
        }

        let mut board = board(&server);
        board.synced().await;
        assert_eq!(board.tickets().fetches_completed, 1);

        assert!(board.update_status(Transition::Close, &TicketId::from(1)).await);
        assert!(board.update_status(Transition::Close, &TicketId::from(2)).await);

        let state = board.tickets.wait_for_fetches(3).await;
        assert_eq!(state.fetches_completed, 3);
        assert_eq!(state.newest_key_completed, 2);
    }

    #[tokio::test]
    async fn detached_mutation_is_recorded_later() {
        let server = MockServer::start().await;
        mount_employees(&server).await;
        Mock::given(method("GET"))
            .and(path("/tickets/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_tickets()))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/inprogress/2/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("Ticket status set to in-progress for page ID 2"),
            )
            .mount(&server)
            .await;

        let mut board = board(&server);
        board.synced().await;

        let id = TicketId::from(2);
        let key = board
            .mutator()
            .mutate(Transition::StartProgress, &id)
            .await;
        assert_eq!(board.refresh_key(), RefreshKey::default());

        assert!(board.record_mutation(key, &id));
        assert_eq!(board.refresh_key().label(), "inprogress2");
        board.synced().await;
        assert_eq!(board.tickets().fetches_completed, 2);
    }

    #[tokio::test]
    async fn rejected_mutation_keeps_view_and_key() {
        let server = MockServer::start().await;
        mount_employees(&server).await;
        Mock::given(method("GET"))
            .and(path("/tickets/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_tickets()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/inprogress/1/"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let mut board = board(&server);
        board.synced().await;
        let before = board.visible();

        assert!(!board.update_status(Transition::StartProgress, &TicketId::from(1)).await);
        assert_eq!(board.refresh_key(), RefreshKey::default());
        assert_eq!(board.visible(), before);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_last_tickets() {
        let server = MockServer::start().await;
        mount_employees(&server).await;
        Mock::given(method("GET"))
            .and(path("/tickets/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_tickets()))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tickets/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/inprogress/1/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("Ticket status set to in-progress for page ID 1"),
            )
            .mount(&server)
            .await;

        let mut board = board(&server);
        board.synced().await;
        assert!(board.tickets().ready);

        assert!(board.update_status(Transition::StartProgress, &TicketId::from(1)).await);
        board.synced().await;

        let tickets = board.tickets();
        assert!(!tickets.ready);
        assert_eq!(tickets.items.len(), 2);
        assert_eq!(ids(&board.visible()), vec!["1", "2"]);
    }
}
