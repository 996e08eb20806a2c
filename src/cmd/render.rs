use chrono::{DateTime, Local, NaiveDateTime};

use crate::domain::employee::Employee;
use crate::domain::filter::FilterCriteria;
use crate::domain::ticket::Ticket;

const DATE_FORMAT: &str = "%d.%m.%Y %H:%M:%S";
const NO_RESULTS: &str = "No results found";

/// Formats a backend timestamp as `08.07.2024 15:44:59`. Unparsable input is
/// returned unchanged.
pub fn format_date(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Local).format(DATE_FORMAT).to_string();
    }
    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, pattern) {
            return parsed.format(DATE_FORMAT).to_string();
        }
    }
    raw.to_string()
}

/// Drops markup from the task body and collapses whitespace.
pub fn strip_html(body: &str) -> String {
    let mut text = String::with_capacity(body.len());
    let mut in_tag = false;
    for ch in body.chars() {
        match ch {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_ticket(ticket: &Ticket) -> String {
    let assignee = if ticket.assignee.is_empty() {
        "unassigned"
    } else {
        ticket.assignee.as_str()
    };
    let mut out = format!(
        "#{} [{}] {}\n    {} | Status: {} // {}",
        ticket.id,
        ticket.priority,
        ticket.title,
        format_date(&ticket.date),
        ticket.status,
        assignee
    );
    let task = strip_html(&ticket.task);
    if !task.is_empty() {
        out.push_str("\n    ");
        out.push_str(&task);
    }
    out
}

pub fn render_tickets(tickets: &[Ticket]) -> String {
    if tickets.is_empty() {
        return NO_RESULTS.to_string();
    }
    tickets
        .iter()
        .map(render_ticket)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_employees(employees: &[Employee]) -> String {
    if employees.is_empty() {
        return NO_RESULTS.to_string();
    }
    employees
        .iter()
        .map(|employee| format!("{} ({})", employee.title, employee.id))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_criteria(criteria: &FilterCriteria) -> String {
    let show = |value: &str| {
        if value.is_empty() {
            "<any>".to_string()
        } else {
            value.to_string()
        }
    };
    format!(
        "priority: {} | assignee: {} | search: {}",
        show(&criteria.priority),
        show(&criteria.assignee),
        show(&criteria.search)
    )
}
