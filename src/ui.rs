//! Terminal output and line input for the CLI

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{Clear, ClearType, disable_raw_mode, enable_raw_mode, size},
};
use std::io::{self, IsTerminal, Write};

use pagent_core::{AgentPersona, AskResponse, HealthReport, HealthStatus, MemoryItem, Source};

const PROMPT: &str = "you>";

/// Restores cooked mode when dropped, including on early return
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        disable_raw_mode().ok();
    }
}

/// Display the chat banner
pub fn display_banner(agent: &AgentPersona, model: &str) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = 60.min(terminal_width.saturating_sub(4)).max(20);
    let border = "─".repeat(banner_width);

    println!();
    println!("{}", border.blue());
    println!("  {}", "pagent - private local agent".blue().bold());
    println!("  {} {} ({})", "agent:".dimmed(), agent.name, agent.agent_id);
    println!("  {} {}", "model:".dimmed(), agent.model_or(model));
    println!("{}", border.blue());
    println!(
        "{}",
        "💡 Ask anything about your documents, or /help for commands".dimmed()
    );
    println!();
}

/// Read one line, with Up/Down history navigation on a terminal.
///
/// Returns `None` on end of input, Ctrl+C or Ctrl+D.
pub fn read_line_with_history(history: &mut Vec<String>) -> io::Result<Option<String>> {
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        let input = input.trim().to_string();
        if !input.is_empty() {
            history.push(input.clone());
        }
        return Ok(Some(input));
    }

    let raw = RawMode::enable()?;
    let mut input = String::new();
    let mut history_index: Option<usize> = None;
    let mut stdout = io::stdout();

    redraw(&mut stdout, &input)?;

    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Enter => {
                drop(raw);
                println!();
                let input = input.trim().to_string();
                if !input.is_empty() {
                    history.push(input.clone());
                }
                return Ok(Some(input));
            }
            KeyCode::Char('c') | KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                drop(raw);
                println!();
                return Ok(None);
            }
            KeyCode::Char(c) => {
                input.push(c);
                redraw(&mut stdout, &input)?;
            }
            KeyCode::Backspace => {
                input.pop();
                redraw(&mut stdout, &input)?;
            }
            KeyCode::Up if !history.is_empty() => {
                let new_index = match history_index {
                    None => history.len() - 1,
                    Some(idx) => idx.saturating_sub(1),
                };
                history_index = Some(new_index);
                input = history[new_index].clone();
                redraw(&mut stdout, &input)?;
            }
            KeyCode::Down => {
                if let Some(idx) = history_index {
                    if idx + 1 < history.len() {
                        history_index = Some(idx + 1);
                        input = history[idx + 1].clone();
                    } else {
                        history_index = None;
                        input.clear();
                    }
                    redraw(&mut stdout, &input)?;
                }
            }
            KeyCode::Esc => {
                input.clear();
                history_index = None;
                redraw(&mut stdout, &input)?;
            }
            _ => {}
        }
    }
}

fn redraw(stdout: &mut io::Stdout, input: &str) -> io::Result<()> {
    execute!(stdout, Clear(ClearType::CurrentLine))?;
    write!(stdout, "\r{} {}", PROMPT.green().bold(), input)?;
    stdout.flush()
}

/// Ask a yes/no question; anything but y/yes is no
pub fn confirm(question: &str) -> io::Result<bool> {
    print!("{} {} [y/N]: ", "❓".cyan(), question);
    io::stdout().flush()?;

    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    let response = response.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}

/// Display chat help
pub fn print_help() {
    println!("{}", "Chat commands:".bold());
    println!("  {} - Ask a question about your documents", "<question>".green());
    println!("  {} - List agents", "/agents".green());
    println!("  {} - Switch to another agent", "/use <agent_id>".green());
    println!(
        "  {} - Create an agent for this session",
        "/create <agent_id> <system prompt>".green()
    );
    println!("  {} - Toggle source listing after answers", "/sources".green());
    println!("  {} - Forget the conversation so far", "/reset".green());
    println!("  {} - Show this help message", "/help".green());
    println!("  {} - Exit", "/exit".green());
}

pub fn print_sources(sources: &[Source]) {
    if sources.is_empty() {
        println!("{}", "No sources.".dimmed());
        return;
    }
    println!("{}", "Sources:".bold());
    for (i, source) in sources.iter().enumerate() {
        println!(
            "  {}. {} ({}) {}",
            i + 1,
            source.filename.cyan(),
            source.chunk_id,
            format!("distance {:.3}", source.distance).dimmed()
        );
        println!("     {}", source.text.replace('\n', " ").dimmed());
    }
}

pub fn print_answer(response: &AskResponse, show_sources: bool) {
    println!("{} {}", "🤖".blue(), response.answer);
    if show_sources {
        println!();
        print_sources(&response.sources);
    }
}

pub fn print_memories(items: &[MemoryItem]) {
    if items.is_empty() {
        println!("{}", "The knowledge base is empty.".dimmed());
        return;
    }
    for item in items {
        let excerpt: String = item.text.chars().take(80).collect::<String>().replace('\n', " ");
        println!(
            "{}  {} {}  {}",
            item.id.yellow(),
            item.filename.as_deref().unwrap_or("unknown").cyan(),
            item.chunk_id.as_deref().unwrap_or("-"),
            excerpt.dimmed()
        );
    }
    println!("{}", format!("{} record(s)", items.len()).bold());
}

pub fn print_agent(agent: &AgentPersona) {
    println!("{} {}", agent.agent_id.green().bold(), format!("({})", agent.name).dimmed());
    if let Some(model) = &agent.model_override {
        println!("  model: {}", model);
    }
    println!("  created: {}", agent.created_at.to_rfc3339());
    println!("  {}", agent.system_prompt);
}

pub fn print_health(report: &HealthReport) {
    let status = match report.status {
        HealthStatus::Healthy => report.status.to_string().green(),
        HealthStatus::Degraded => report.status.to_string().yellow(),
        HealthStatus::Unhealthy => report.status.to_string().red(),
    };
    let mark = |ok: bool| if ok { "✅" } else { "❌" };

    println!("{} {}", "Status:".bold(), status);
    println!("  {} generation service", mark(report.generation_connected));
    println!("  {} vector store", mark(report.store_connected));
}
