use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketStatus {
    Open,
    InProgress,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 3] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::Closed,
    ];

    /// Value stored on the record and shown on the board.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in-progress",
            TicketStatus::Closed => "closed",
        }
    }

    /// Path segment of the status endpoint, `/api/{action}/{id}/`.
    pub fn action_name(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "inprogress",
            TicketStatus::Closed => "closed",
        }
    }

    /// Exact match on the endpoint's action names.
    pub fn from_action_name(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.action_name() == value)
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "open" => Some(TicketStatus::Open),
            "in-progress" | "inprogress" | "progress" => Some(TicketStatus::InProgress),
            "closed" | "close" => Some(TicketStatus::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The status changes a board user can trigger. Reopening is an
/// administrative operation and not part of the board controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    StartProgress,
    Close,
}

impl Transition {
    pub fn target(&self) -> TicketStatus {
        match self {
            Transition::StartProgress => TicketStatus::InProgress,
            Transition::Close => TicketStatus::Closed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Tag used on the wire, which doubles as the card's style class.
    pub fn tag(&self) -> &'static str {
        match self {
            Priority::High => "priority-high",
            Priority::Medium => "priority-medium",
            Priority::Low => "priority-low",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        match value.strip_prefix("priority-").unwrap_or(&value) {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}
