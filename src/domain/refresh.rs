use std::fmt;

use crate::domain::status::TicketStatus;
use crate::domain::ticket::TicketId;

/// Value whose change makes the ticket loader fetch again. Only identity
/// matters; the label is kept for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshKey {
    label: String,
    sequence: u64,
}

impl RefreshKey {
    /// Key produced by the `sequence`-th successful mutation. The sequence
    /// keeps repeated identical mutations distinct.
    pub fn after_mutation(status: TicketStatus, id: &TicketId, sequence: u64) -> Self {
        Self {
            label: format!("{}{}", status.action_name(), id),
            sequence,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl fmt::Display for RefreshKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}
