use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use crate::cmd::render::{render_criteria, render_employees, render_tickets};
use crate::cmd::ticket::parse_priority;
use crate::context::AppContext;
use crate::domain::refresh::RefreshKey;
use crate::domain::status::{Priority, Transition};
use crate::domain::ticket::TicketId;
use crate::error::{AppError, AppResult};
use crate::workflow::board::{Board, BoardState};

const HELP: &str = "\
commands:
  priority <high|medium|low>   show only one priority
  all                          clear priority and assignee filters
  assignee [NAME]              filter by employee (no name clears)
  search [TEXT]                free-text search (no text clears)
  progress <ID>                set ticket in progress
  close <ID>                   close ticket
  show                         print the board
  employees                    list employees
  help                         this text
  quit                         leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Priority(Option<Priority>),
    ShowAll,
    Assignee(String),
    Search(String),
    Transition(Transition, TicketId),
    Show,
    Employees,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> AppResult<Option<SessionCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_lowercase().as_str() {
        "priority" => SessionCommand::Priority(parse_priority(Some(rest))?),
        "all" => SessionCommand::ShowAll,
        "assignee" => SessionCommand::Assignee(rest.to_string()),
        "search" => SessionCommand::Search(rest.to_string()),
        "progress" => SessionCommand::Transition(Transition::StartProgress, ticket_id(rest)?),
        "close" => SessionCommand::Transition(Transition::Close, ticket_id(rest)?),
        "show" => SessionCommand::Show,
        "employees" => SessionCommand::Employees,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        other => {
            return Err(AppError::InvalidInput(format!(
                "unknown command '{other}', try 'help'"
            )));
        }
    };
    Ok(Some(command))
}

fn ticket_id(raw: &str) -> AppResult<TicketId> {
    let id = TicketId::new(raw);
    if id.is_empty() {
        return Err(AppError::InvalidInput("a ticket id is required".to_string()));
    }
    Ok(id)
}

/// A status change that finished in the background.
#[derive(Debug)]
struct Settled {
    transition: Transition,
    id: TicketId,
    key: Option<RefreshKey>,
}

/// Interactive board over stdin. The list is printed again whenever a
/// ticket fetch resolves or a filter changes. Status changes run in the
/// background so input keeps being read while they are in flight.
pub async fn run(ctx: &AppContext) -> AppResult<()> {
    let mut board = Board::from_context(ctx, BoardState::default());
    let mut ticket_updates = board.subscribe_tickets();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let (settled_tx, mut settled_rx) = mpsc::unbounded_channel();

    println!("{HELP}");

    loop {
        tokio::select! {
            changed = ticket_updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let ready = ticket_updates.borrow_and_update().ready;
                if !ready {
                    eprintln!("Warning: tickets could not be loaded; showing last known state.");
                }
                print_board(&board);
            }
            Some(settled) = settled_rx.recv() => settle(&mut board, settled),
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(SessionCommand::Quit)) => break,
                    Ok(Some(command)) => execute(&mut board, command, &settled_tx),
                    Err(err) => eprintln!("{err}"),
                }
            }
        }
    }

    Ok(())
}

fn execute(board: &mut Board, command: SessionCommand, settled: &mpsc::UnboundedSender<Settled>) {
    debug!(?command, "session command");
    match command {
        SessionCommand::Priority(priority) => {
            board.set_priority(priority);
            print_board(board);
        }
        SessionCommand::ShowAll => {
            board.show_all();
            print_board(board);
        }
        SessionCommand::Assignee(name) => match board.set_assignee(&name) {
            Ok(()) => print_board(board),
            Err(err) => eprintln!("{err}"),
        },
        SessionCommand::Search(text) => {
            board.set_search(&text);
            print_board(board);
        }
        SessionCommand::Transition(transition, id) => {
            println!("Setting ticket {id} to {}...", transition.target());
            spawn_transition(board, transition, id, settled.clone());
        }
        SessionCommand::Show => print_board(board),
        SessionCommand::Employees => println!("{}", render_employees(&board.employees().items)),
        SessionCommand::Help => println!("{HELP}"),
        SessionCommand::Quit => {}
    }
}

fn spawn_transition(
    board: &Board,
    transition: Transition,
    id: TicketId,
    settled: mpsc::UnboundedSender<Settled>,
) {
    let mutator = board.mutator();
    tokio::spawn(async move {
        let key = mutator.mutate(transition, &id).await;
        let _ = settled.send(Settled { transition, id, key });
    });
}

fn settle(board: &mut Board, settled: Settled) {
    let Settled { transition, id, key } = settled;
    if board.record_mutation(key, &id) {
        debug!(key = %board.refresh_key(), "refresh scheduled");
        println!("Ticket {id} set to {}, refreshing...", transition.target());
    } else {
        eprintln!("Ticket {id} was not updated.");
    }
}

fn print_board(board: &Board) {
    println!("\n{}", render_criteria(board.criteria()));
    println!("{}", render_tickets(&board.visible()));
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;
    use crate::domain::employee::Employee;
    use crate::domain::status::TicketStatus;
    use crate::domain::ticket::Ticket;
    use crate::services::{CollectionSource, StatusEndpoint};
    use crate::workflow::loader::StalePolicy;

    struct FixedTickets;

    #[async_trait]
    impl CollectionSource<Ticket> for FixedTickets {
        fn location(&self) -> &str {
            "test://tickets"
        }

        async fn fetch(&self) -> AppResult<Vec<Ticket>> {
            Ok(vec![Ticket {
                id: TicketId::from(1),
                title: "Printer".to_string(),
                priority: "priority-high".to_string(),
                ..Default::default()
            }])
        }
    }

    struct NoEmployees;

    #[async_trait]
    impl CollectionSource<Employee> for NoEmployees {
        fn location(&self) -> &str {
            "test://employees"
        }

        async fn fetch(&self) -> AppResult<Vec<Employee>> {
            Ok(Vec::new())
        }
    }

    /// Answers only once the test releases the gate.
    struct HeldEndpoint {
        gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait]
    impl StatusEndpoint for HeldEndpoint {
        async fn set_status(&self, status: TicketStatus, id: &TicketId) -> AppResult<String> {
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(format!("Ticket status set to {status} for page ID {id}"))
        }
    }

    #[tokio::test]
    async fn filters_keep_working_while_a_transition_is_in_flight() {
        let (release, gate) = oneshot::channel();
        let mut board = Board::new(
            BoardState::default(),
            Arc::new(FixedTickets),
            Arc::new(NoEmployees),
            Arc::new(HeldEndpoint {
                gate: Mutex::new(Some(gate)),
            }),
            StalePolicy::default(),
        );
        board.synced().await;
        let (settled_tx, mut settled_rx) = mpsc::unbounded_channel();

        execute(
            &mut board,
            SessionCommand::Transition(Transition::Close, TicketId::from(1)),
            &settled_tx,
        );
        execute(&mut board, SessionCommand::Search("nothing".to_string()), &settled_tx);
        assert!(board.visible().is_empty());
        assert!(settled_rx.try_recv().is_err());
        assert_eq!(board.refresh_key(), RefreshKey::default());

        release.send(()).unwrap();
        let settled = settled_rx.recv().await.unwrap();
        settle(&mut board, settled);

        assert_eq!(board.refresh_key().label(), "closed1");
        board.synced().await;
        assert_eq!(board.tickets().fetches_completed, 2);
    }

    #[test]
    fn parses_filter_commands() {
        assert_eq!(
            parse_command("priority high").unwrap(),
            Some(SessionCommand::Priority(Some(Priority::High)))
        );
        assert_eq!(
            parse_command("priority").unwrap(),
            Some(SessionCommand::Priority(None))
        );
        assert_eq!(
            parse_command("assignee  Alice Smith ").unwrap(),
            Some(SessionCommand::Assignee("Alice Smith".to_string()))
        );
        assert_eq!(
            parse_command("search").unwrap(),
            Some(SessionCommand::Search(String::new()))
        );
        assert_eq!(parse_command("ALL").unwrap(), Some(SessionCommand::ShowAll));
    }

    #[test]
    fn parses_transitions() {
        assert_eq!(
            parse_command("close 42").unwrap(),
            Some(SessionCommand::Transition(
                Transition::Close,
                TicketId::from(42)
            ))
        );
        assert_eq!(
            parse_command("progress 7").unwrap(),
            Some(SessionCommand::Transition(
                Transition::StartProgress,
                TicketId::from(7)
            ))
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("close").is_err());
        assert!(parse_command("priority urgent").is_err());
        assert!(parse_command("open 3").is_err());
    }

    #[test]
    fn blank_line_is_ignored() {
        assert_eq!(parse_command("   ").unwrap(), None);
    }
}
