//! Command-line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pagent_core::DEFAULT_AGENT_ID;

#[derive(Parser)]
#[command(name = "pagent")]
#[command(about = "Private local agent: answers questions from your own documents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add documents (.txt, .pdf, .docx, .doc) to the knowledge base
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Extra metadata stored with every chunk, as key=value
        #[arg(short, long = "meta", value_parser = parse_key_value)]
        meta: Vec<(String, String)>,
    },

    /// Add raw text to the knowledge base (reads stdin when no text is given)
    IngestText {
        #[arg(short, long, default_value = "text_input")]
        filename: String,

        text: Option<String>,
    },

    /// Ask a single question
    Ask {
        question: String,

        #[arg(short, long, default_value = DEFAULT_AGENT_ID)]
        agent: String,

        /// Print the answer as it is generated
        #[arg(short, long)]
        stream: bool,

        /// Print the full response as JSON
        #[arg(long, conflicts_with = "stream")]
        json: bool,
    },

    /// Interactive chat session
    Chat {
        #[arg(short, long, default_value = DEFAULT_AGENT_ID)]
        agent: String,
    },

    /// Inspect or prune the knowledge base
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Inspect agent personas
    Agents {
        #[command(subcommand)]
        action: Option<AgentAction>,
    },

    /// Check the generation service and the vector store
    Health {
        /// Also embed a probe text and report the vector length
        #[arg(short, long)]
        embedding: bool,
    },
}

#[derive(Subcommand)]
pub enum MemoryAction {
    /// List every stored record
    List {
        #[arg(long)]
        json: bool,
    },
    /// Delete one record by id
    Delete { id: String },
    /// Delete every record
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum AgentAction {
    List,
    Show {
        id: String,
    },
    /// Register a persona for this process, optionally chatting with it
    Create {
        id: String,

        /// Display name (defaults to the id)
        #[arg(short, long)]
        name: Option<String>,

        /// System prompt the persona answers with
        #[arg(short, long)]
        prompt: String,

        /// Generation model used instead of the default
        #[arg(short, long)]
        model: Option<String>,

        /// Start a chat session with the new persona
        #[arg(long)]
        chat: bool,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("project=apollo").unwrap(),
            ("project".to_string(), "apollo".to_string())
        );
        assert_eq!(parse_key_value("note=a=b").unwrap().1, "a=b");
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_ask_defaults_to_default_agent() {
        let cli = Cli::try_parse_from(["pagent", "ask", "what is in my notes?"]).unwrap();
        match cli.command {
            Some(Commands::Ask { question, agent, stream, json }) => {
                assert_eq!(question, "what is in my notes?");
                assert_eq!(agent, DEFAULT_AGENT_ID);
                assert!(!stream);
                assert!(!json);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_ingest_with_metadata() {
        let cli = Cli::try_parse_from(["pagent", "ingest", "a.txt", "b.pdf", "-m", "team=core"]).unwrap();
        match cli.command {
            Some(Commands::Ingest { files, meta }) => {
                assert_eq!(files.len(), 2);
                assert_eq!(meta, vec![("team".to_string(), "core".to_string())]);
            }
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn test_stream_and_json_conflict() {
        assert!(Cli::try_parse_from(["pagent", "ask", "q", "--stream", "--json"]).is_err());
    }

    #[test]
    fn test_agents_create() {
        let cli = Cli::try_parse_from([
            "pagent", "agents", "create", "coder", "--prompt", "Answer with Rust code.", "-m", "codellama",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Agents {
                action: Some(AgentAction::Create { id, name, prompt, model, chat }),
            }) => {
                assert_eq!(id, "coder");
                assert_eq!(name, None);
                assert_eq!(prompt, "Answer with Rust code.");
                assert_eq!(model.as_deref(), Some("codellama"));
                assert!(!chat);
            }
            _ => panic!("expected agents create"),
        }

        assert!(Cli::try_parse_from(["pagent", "agents", "create", "coder"]).is_err());
    }
}
