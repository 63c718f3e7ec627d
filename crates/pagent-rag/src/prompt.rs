//! Context and prompt assembly

use pagent_core::{AgentPersona, ConversationTurn, RetrievalHit, Source};

/// Number of most recent history turns kept in the conversation prompt
pub const HISTORY_WINDOW: usize = 5;

/// Longest chunk excerpt placed in the context block, in characters
pub const CONTEXT_EXCERPT_CHARS: usize = 500;

/// Longest chunk excerpt returned as a source, in characters
pub const SOURCE_EXCERPT_CHARS: usize = 200;

pub const NO_DOCUMENTS: &str = "No relevant documents found in the knowledge base.";

/// The two prompts sent to generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Cut `text` to `max_chars` characters, marking the cut with `...`
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Render retrieved hits as the context block of the system prompt
pub fn render_context(hits: &[RetrievalHit]) -> String {
    if hits.is_empty() {
        return NO_DOCUMENTS.to_string();
    }

    let entries: Vec<String> = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "{}. From {} (chunk {}): {}",
                i + 1,
                hit.metadata_or_unknown("filename"),
                hit.metadata_or_unknown("chunk_id"),
                truncate_chars(&hit.text, CONTEXT_EXCERPT_CHARS)
            )
        })
        .collect();

    format!("Relevant documents from knowledge base:\n\n{}", entries.join("\n\n"))
}

/// Render the last `HISTORY_WINDOW` turns followed by the current input
pub fn render_conversation(history: &[ConversationTurn], current_input: &str) -> String {
    if history.is_empty() {
        return current_input.to_string();
    }

    let start = history.len().saturating_sub(HISTORY_WINDOW);
    let mut lines: Vec<String> = history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect();
    lines.push(format!("user: {}", current_input));
    lines.join("\n")
}

/// Build the system and user prompts for one question
pub fn build_prompt(
    persona: &AgentPersona,
    hits: &[RetrievalHit],
    history: &[ConversationTurn],
    current_input: &str,
) -> AssembledPrompt {
    AssembledPrompt {
        system_prompt: format!("{}\n\n{}", persona.system_prompt, render_context(hits)),
        user_prompt: render_conversation(history, current_input),
    }
}

/// Hits as cited sources, in retrieval order
pub fn format_sources(hits: &[RetrievalHit]) -> Vec<Source> {
    hits.iter()
        .map(|hit| Source {
            filename: hit.metadata_or_unknown("filename"),
            chunk_id: hit.metadata_or_unknown("chunk_id"),
            text: truncate_chars(&hit.text, SOURCE_EXCERPT_CHARS),
            distance: hit.distance,
        })
        .collect()
}
