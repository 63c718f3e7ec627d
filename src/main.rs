mod cli;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use futures::StreamExt;
use serde_json::Value;
use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pagent_core::{ConversationTurn, ErrorKind, LLMProvider, Metadata, Settings};
use pagent_ollama::{OllamaClient, OllamaConfig};
use pagent_rag::RagEngine;

use cli::{AgentAction, Cli, Commands, MemoryAction};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_error(&e),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env()?;
    init_logging(&settings.log_level);

    let engine = build_engine(settings).await?;

    match cli.command {
        Some(Commands::Ingest { files, meta }) => {
            let mut metadata = Metadata::new();
            for (key, value) in meta {
                metadata.insert(key, Value::String(value));
            }
            for file in files {
                let result = engine.ingest_file(&file, metadata.clone()).await?;
                println!(
                    "{} {} ({} chunks, {} characters)",
                    "✅".green(),
                    result.filename.bold(),
                    result.chunks_created,
                    result.file_size
                );
            }
        }
        Some(Commands::IngestText { filename, text }) => {
            let text = match text {
                Some(text) => text,
                None => {
                    let mut buffer = String::new();
                    io::stdin().read_to_string(&mut buffer).context("Failed to read stdin")?;
                    buffer
                }
            };
            let result = engine.ingest_text(&text, &filename).await?;
            println!(
                "{} {} ({} chunks, {} characters)",
                "✅".green(),
                result.filename.bold(),
                result.chunks_created,
                result.file_size
            );
        }
        Some(Commands::Ask { question, agent, stream, json }) => {
            if stream {
                let (_, sources) = stream_answer(&engine, &agent, &question, &[]).await?;
                println!();
                ui::print_sources(&sources);
            } else {
                let response = engine.ask(&agent, &question, &[]).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&response)?);
                } else {
                    ui::print_answer(&response, true);
                }
            }
        }
        Some(Commands::Chat { agent }) => chat(&engine, agent).await?,
        None => chat(&engine, pagent_core::DEFAULT_AGENT_ID.to_string()).await?,
        Some(Commands::Memory { action }) => match action {
            MemoryAction::List { json } => {
                let items = engine.list_memories().await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&items)?);
                } else {
                    ui::print_memories(&items);
                }
            }
            MemoryAction::Delete { id } => {
                engine.delete_memory(&id).await?;
                println!("{} Deleted {}", "✅".green(), id);
            }
            MemoryAction::Clear { yes } => {
                if yes || ui::confirm("Delete every record in the knowledge base?")? {
                    engine.clear_memories().await?;
                    println!("{} Knowledge base cleared", "✅".green());
                } else {
                    println!("{}", "Nothing deleted.".dimmed());
                }
            }
        },
        Some(Commands::Agents { action }) => match action {
            None | Some(AgentAction::List) => {
                for agent in engine.list_agents()? {
                    ui::print_agent(&agent);
                }
            }
            Some(AgentAction::Show { id }) => ui::print_agent(&engine.get_agent(&id)?),
            Some(AgentAction::Create { id, name, prompt, model, chat: start_chat }) => {
                let name = name.unwrap_or_else(|| id.clone());
                let agent = engine.create_agent(&id, &name, &prompt, model)?;
                println!("{} Created agent {}", "✅".green(), agent.agent_id.bold());
                ui::print_agent(&agent);
                if start_chat {
                    chat(&engine, agent.agent_id).await?;
                } else {
                    println!("{}", "💡 Agents live for one process; add --chat to talk to it now".dimmed());
                }
            }
        },
        Some(Commands::Health { embedding }) => {
            let report = engine.health().await;
            ui::print_health(&report);
            if embedding {
                match engine.embedding_dimension().await {
                    Ok(dimension) => println!("  ✅ embeddings ({} dimensions)", dimension),
                    Err(e) => println!("  ❌ embeddings: {}", e),
                }
            }
        }
    }

    Ok(())
}

/// Install the stderr subscriber: `RUST_LOG` wins over `LOG_LEVEL`
fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn build_engine(settings: Settings) -> Result<RagEngine> {
    let client = OllamaClient::new(OllamaConfig::from_settings(&settings))?;
    debug!(model = %client.default_model(), "Generation client ready");
    let engine = RagEngine::from_settings(settings, Arc::new(client)).await?;
    Ok(engine)
}

/// Print fragments as they arrive; returns the full answer and its sources
async fn stream_answer(
    engine: &RagEngine,
    agent_id: &str,
    question: &str,
    history: &[ConversationTurn],
) -> Result<(String, Vec<pagent_core::Source>)> {
    let mut response = engine.ask_stream(agent_id, question, history).await?;
    let mut answer = String::new();
    let mut stdout = io::stdout();

    print!("{} ", "🤖".blue());
    while let Some(fragment) = response.fragments.next().await {
        let fragment = fragment?;
        print!("{}", fragment);
        stdout.flush()?;
        answer.push_str(&fragment);
    }
    println!();

    Ok((answer, response.sources))
}

async fn chat(engine: &RagEngine, agent_id: String) -> Result<()> {
    let mut agent = engine.get_agent(&agent_id)?;
    let default_model = engine.settings().ollama_model.clone();
    ui::display_banner(&agent, &default_model);

    let mut input_history = Vec::new();
    let mut conversation: Vec<ConversationTurn> = Vec::new();
    let mut show_sources = false;

    while let Some(input) = ui::read_line_with_history(&mut input_history)? {
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
            match name {
                "exit" | "quit" => break,
                "help" => ui::print_help(),
                "agents" => {
                    for persona in engine.list_agents()? {
                        ui::print_agent(&persona);
                    }
                }
                "use" => match engine.get_agent(rest.trim()) {
                    Ok(persona) => {
                        agent = persona;
                        conversation.clear();
                        println!("{} Now talking to {}", "✅".green(), agent.name.bold());
                    }
                    Err(e) => println!("{} {}", "❌".red(), e),
                },
                "create" => {
                    let (id, prompt) = rest.trim().split_once(' ').unwrap_or((rest.trim(), ""));
                    if prompt.trim().is_empty() {
                        println!("{} Usage: /create <agent_id> <system prompt>", "⚠️".yellow());
                        continue;
                    }
                    match engine.create_agent(id, id, prompt.trim(), None) {
                        Ok(persona) => println!("{} Created agent {}", "✅".green(), persona.agent_id.bold()),
                        Err(e) => println!("{} {}", "❌".red(), e),
                    }
                }
                "sources" => {
                    show_sources = !show_sources;
                    let state = if show_sources { "on" } else { "off" };
                    println!("{} Sources {}", "💡".cyan(), state);
                }
                "reset" => {
                    conversation.clear();
                    println!("{} Conversation reset", "✅".green());
                }
                _ => println!("{} Unknown command /{}, try /help", "⚠️".yellow(), name),
            }
            continue;
        }

        match stream_answer(engine, &agent.agent_id, &input, &conversation).await {
            Ok((answer, sources)) => {
                if show_sources {
                    ui::print_sources(&sources);
                }
                conversation.push(ConversationTurn::user(input));
                conversation.push(ConversationTurn::assistant(answer));
            }
            Err(e) => {
                println!();
                println!("{} {}", "❌".red(), e);
            }
        }
    }

    println!("{}", "👋 Goodbye!".green());
    Ok(())
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<pagent_core::Error>().map(|e| e.kind()) {
        Some(ErrorKind::Validation) => {
            eprintln!("{} Rejected: {}", "❌".red(), err);
            ExitCode::from(2)
        }
        _ => {
            eprintln!("{} Service failure: {:#}", "❌".red(), err);
            ExitCode::FAILURE
        }
    }
}
