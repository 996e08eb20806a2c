use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::domain::employee::Employee;
use crate::domain::status::{Priority, TicketStatus};
use crate::domain::ticket::{Ticket, TicketId};
use crate::error::{AppError, AppResult};

/// Backend-side ticket record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTicket {
    pub id: TicketId,
    pub date: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub title: String,
    pub task: String,
    pub assignee: String,
}

impl StoredTicket {
    fn to_feed(&self) -> Ticket {
        Ticket {
            id: self.id.clone(),
            date: self.date.clone(),
            status: self.status.as_str().to_string(),
            priority: self.priority.tag().to_string(),
            title: self.title.clone(),
            task: self.task.clone(),
            assignee: self.assignee.clone(),
        }
    }
}

/// Result of a status action against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorityOutcome {
    Updated(String),
    UnknownId,
    UnknownAction(String),
}

/// In-memory record store behind the development server.
#[derive(Debug, Clone, Default)]
pub struct TicketStore {
    tickets: Vec<StoredTicket>,
    employees: Vec<Employee>,
}

impl TicketStore {
    pub fn new(tickets: Vec<StoredTicket>, employees: Vec<Employee>) -> Self {
        Self { tickets, employees }
    }

    pub fn from_seed_file(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_seed_json(&contents)
    }

    pub fn from_seed_json(contents: &str) -> AppResult<Self> {
        let seed: Seed = serde_json::from_str(contents)
            .map_err(|err| AppError::Configuration(format!("invalid seed file: {err}")))?;

        let tickets = seed
            .tickets
            .into_iter()
            .map(SeedTicket::into_stored)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self::new(tickets, seed.employees))
    }

    pub fn sample() -> Self {
        let tickets = [
            (
                1021_u64,
                "2024-07-08 15:44:59",
                TicketStatus::Open,
                Priority::High,
                "Printer offline",
                "<p>The printer on the second floor does not respond.</p>",
                "Alice",
            ),
            (
                1022,
                "2024-07-09 09:12:03",
                TicketStatus::InProgress,
                Priority::Medium,
                "VPN access",
                "<p>New colleague needs VPN credentials.</p>",
                "Bob",
            ),
            (
                1023,
                "2024-07-10 11:30:00",
                TicketStatus::Open,
                Priority::Low,
                "Replace keyboard",
                "<p>Some keys are stuck.</p>",
                "",
            ),
            (
                1024,
                "2024-07-01 08:00:00",
                TicketStatus::Closed,
                Priority::Medium,
                "Monitor cable",
                "<p>Done.</p>",
                "Alice",
            ),
        ]
        .into_iter()
        .map(
            |(id, date, status, priority, title, task, assignee)| StoredTicket {
                id: TicketId::from(id),
                date: date.to_string(),
                status,
                priority,
                title: title.to_string(),
                task: task.to_string(),
                assignee: assignee.to_string(),
            },
        )
        .collect();

        let employees = [(11_u64, "Alice"), (12, "Bob")]
            .into_iter()
            .map(|(id, title)| Employee {
                id: TicketId::from(id),
                title: title.to_string(),
            })
            .collect();

        Self::new(tickets, employees)
    }

    /// Tickets as served by `/tickets/`: closed ones are left out.
    pub fn feed(&self) -> Vec<Ticket> {
        self.tickets
            .iter()
            .filter(|ticket| ticket.status != TicketStatus::Closed)
            .map(StoredTicket::to_feed)
            .collect()
    }

    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    pub fn get(&self, id: &TicketId) -> Option<&StoredTicket> {
        self.tickets.iter().find(|ticket| &ticket.id == id)
    }

    /// Overwrites the status of ticket `id` for a known action name. Any
    /// status is reachable from any other.
    pub fn apply(&mut self, action: &str, id: &TicketId) -> AuthorityOutcome {
        let Some(status) = TicketStatus::from_action_name(action) else {
            return AuthorityOutcome::UnknownAction(action.to_string());
        };

        match self.tickets.iter_mut().find(|ticket| &ticket.id == id) {
            Some(ticket) => {
                ticket.status = status;
                AuthorityOutcome::Updated(format!(
                    "Ticket status set to {status} for page ID {id}"
                ))
            }
            None => AuthorityOutcome::UnknownId,
        }
    }
}

#[derive(Deserialize)]
struct Seed {
    #[serde(default)]
    tickets: Vec<SeedTicket>,
    #[serde(default)]
    employees: Vec<Employee>,
}

#[derive(Deserialize)]
struct SeedTicket {
    id: TicketId,
    #[serde(default)]
    date: String,
    status: String,
    priority: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    task: String,
    #[serde(default)]
    assignee: String,
}

impl SeedTicket {
    fn into_stored(self) -> AppResult<StoredTicket> {
        let status = TicketStatus::from_str(&self.status).ok_or_else(|| {
            AppError::Configuration(format!("ticket {}: unknown status '{}'", self.id, self.status))
        })?;
        let priority = Priority::from_str(&self.priority).ok_or_else(|| {
            AppError::Configuration(format!(
                "ticket {}: unknown priority '{}'",
                self.id, self.priority
            ))
        })?;

        Ok(StoredTicket {
            id: self.id,
            date: self.date,
            status,
            priority,
            title: self.title,
            task: self.task,
            assignee: self.assignee,
        })
    }
}
