use crate::domain::status::Priority;
use crate::domain::ticket::Ticket;

/// Board filter state. Empty strings mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub priority: String,
    pub assignee: String,
    pub search: String,
}

impl FilterCriteria {
    pub fn with_priority(mut self, priority: Option<Priority>) -> Self {
        self.priority = priority.map(|p| p.tag().to_string()).unwrap_or_default();
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn apply(&self, tickets: &[Ticket]) -> Vec<Ticket> {
        visible(tickets, &self.priority, &self.assignee, &self.search)
    }
}

/// Derives the visible tickets. Each stage narrows the output of the one
/// before it and the original order is kept.
pub fn visible(
    tickets: &[Ticket],
    priority_filter: &str,
    assignee_filter: &str,
    search_text: &str,
) -> Vec<Ticket> {
    let by_priority = by_priority(tickets.iter(), priority_filter);
    let by_assignee = by_assignee(by_priority.into_iter(), assignee_filter);

    let result = if search_text.is_empty() {
        by_assignee
    } else {
        by_search(by_assignee.into_iter(), search_text)
    };

    result.into_iter().cloned().collect()
}

fn by_priority<'a>(tickets: impl Iterator<Item = &'a Ticket>, filter: &str) -> Vec<&'a Ticket> {
    tickets
        .filter(|ticket| ticket.priority.contains(filter))
        .collect()
}

fn by_assignee<'a>(tickets: impl Iterator<Item = &'a Ticket>, filter: &str) -> Vec<&'a Ticket> {
    tickets
        .filter(|ticket| ticket.assignee.contains(filter))
        .collect()
}

fn by_search<'a>(tickets: impl Iterator<Item = &'a Ticket>, query: &str) -> Vec<&'a Ticket> {
    let needle = query.to_lowercase();
    tickets
        .filter(|ticket| {
            ticket
                .searchable_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}
