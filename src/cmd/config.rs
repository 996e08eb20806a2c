use std::io::{self, Write};

use clap::{Args, Subcommand};

use crate::config::{AppConfig, StoredConfig, config_file_path};
use crate::error::{AppError, AppResult};

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Run the interactive configuration wizard.
    Init,
    /// Show the stored and the effective configuration.
    Show,
}

pub fn run(command: ConfigCommand, base_url_override: Option<String>) -> AppResult<()> {
    match command {
        ConfigCommand::Init => run_init(),
        ConfigCommand::Show => run_show(base_url_override),
    }
}

fn run_init() -> AppResult<()> {
    let mut cfg = StoredConfig::load()?;

    println!("Configuring ticketboard.");
    println!("Press Enter to keep the current value, '-' to clear it.");
    println!();

    apply_prompt(
        "Backend base URL (e.g., http://localhost:10024)",
        &mut cfg.base_url,
    )?;

    let mut timeout = cfg.request_timeout_secs.map(|secs| secs.to_string());
    apply_prompt("Request timeout in seconds (empty for none)", &mut timeout)?;
    cfg.request_timeout_secs = parse_field(timeout, "request timeout")?;

    apply_prompt("Log level (error/warn/info/debug/trace)", &mut cfg.log_level)?;

    let mut discard = cfg.discard_stale_responses.map(|flag| flag.to_string());
    apply_prompt("Discard stale responses (true/false)", &mut discard)?;
    cfg.discard_stale_responses = parse_field(discard, "discard stale responses")?;

    cfg.save()?;

    let path = config_file_path()?;
    println!("\nConfiguration saved to {}", path.display());
    Ok(())
}

fn run_show(base_url_override: Option<String>) -> AppResult<()> {
    let cfg = StoredConfig::load()?;
    let effective = AppConfig::load(base_url_override)?;
    let path = config_file_path()?;

    println!("Configuration file: {}", path.display());
    println!("Stored base URL: {}", display_value(&cfg.base_url));
    println!(
        "Stored timeout: {}",
        display_value(&cfg.request_timeout_secs.map(|secs| format!("{secs}s")))
    );
    println!("Stored log level: {}", display_value(&cfg.log_level));
    println!(
        "Stored discard stale: {}",
        display_value(&cfg.discard_stale_responses.map(|flag| flag.to_string()))
    );
    println!();
    println!("Effective base URL: {}", effective.base_url);
    println!(
        "Effective timeout: {}",
        effective
            .request_timeout_secs
            .map(|secs| format!("{secs}s"))
            .unwrap_or_else(|| "none".to_string())
    );
    println!("Effective log level: {}", effective.log_level);
    println!(
        "Effective discard stale: {}",
        effective.discard_stale_responses
    );

    Ok(())
}

fn parse_field<T: std::str::FromStr>(value: Option<String>, field: &str) -> AppResult<Option<T>> {
    value
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| AppError::InvalidInput(format!("invalid {field}: '{raw}'")))
        })
        .transpose()
}

fn apply_prompt(field: &str, target: &mut Option<String>) -> AppResult<()> {
    match prompt(field, target.as_deref())? {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => *target = Some(value),
    }
    Ok(())
}

fn prompt(field: &str, current: Option<&str>) -> AppResult<PromptAction> {
    let mut stdout = io::stdout();

    match current {
        Some(value) => write!(stdout, "{field} [{value}] (Enter to keep, '-' to clear): ")?,
        None => write!(stdout, "{field} (Enter to skip): ")?,
    }
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(PromptAction::from_input(&input))
}

fn display_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<not set>".to_string())
}

#[derive(Debug, PartialEq, Eq)]
enum PromptAction {
    Keep,
    Clear,
    Set(String),
}

impl PromptAction {
    fn from_input(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            PromptAction::Keep
        } else if trimmed == "-" {
            PromptAction::Clear
        } else {
            PromptAction::Set(trimmed.to_string())
        }
    }
}
