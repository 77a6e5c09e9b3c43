//! Prompt builders and response parsing for chat-completion models.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::analysis::SelectionSummary;
use crate::conversation::{Message, GENERAL_METRICS, MAX_GOAL_METRICS};
use crate::generation::{GenerationError, Result};

fn goal_block(goal: Option<&str>) -> String {
    match goal {
        Some(g) => format!("\n<conversation_goal>\n{g}\n</conversation_goal>\n"),
        None => String::new(),
    }
}

/// System prompt asking for one response unlike the existing ones
pub fn branch_prompt(existing_responses: &[String], goal: Option<&str>) -> String {
    let previous = serde_json::to_string(existing_responses).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Write ONE candidate for the assistant's next message in this conversation. \
It must take a clearly different approach from every previous candidate.\n{}\
<previous_candidates>\n{previous}\n</previous_candidates>\n\n\
Return JSON:\n{{\"response\": \"Your new response here\"}}",
        goal_block(goal)
    )
}

/// System prompt for the other participant's next turn
pub fn reaction_prompt(goal: Option<&str>) -> String {
    let hint = match goal {
        Some(g) => format!(" The assistant is trying to: {g}. React realistically, not necessarily favorably."),
        None => String::new(),
    };
    format!(
        "You play the USER in the transcript below. Write the user's next message only, \
in their voice, with no labels or commentary.{hint}"
    )
}

/// System prompt for the assistant's next turn inside a rollout
pub fn continuation_prompt() -> String {
    "Continue the conversation as the assistant. Write only the next assistant message.".to_string()
}

/// System prompt asking for general and goal metric scores
pub fn scoring_prompt(goal: Option<&str>) -> String {
    let metrics = GENERAL_METRICS.map(|m| format!("- {m}")).join("\n");
    let goal_section = match goal {
        Some(g) => format!(
            "\n<goal_specific_scoring>\nConversation goal: {g}\n\
Score 3-{MAX_GOAL_METRICS} metrics specific to achieving this goal (0.0-1.0).\n</goal_specific_scoring>\n"
        ),
        None => String::new(),
    };
    format!(
        "Score the assistant's side of the transcript below.\n\n\
General metrics (0.0-1.0):\n{metrics}\n{goal_section}\n\
Return JSON:\n{{\n  \"general_metrics\": {{\"clarity\": 0.85, ...}},\n  \"goal_metrics\": {{\"metric\": 0.8, ...}}\n}}"
    )
}

/// System prompt asking why the selected option won
pub fn explanation_prompt(summary: &SelectionSummary, goal: Option<&str>) -> String {
    let options = serde_json::to_string_pretty(&summary.options).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Explain why the selected response is the best next message.\n{}\
<selected_response>\nResponse: {}\nScore: {:.3}\nVisits: {}\n</selected_response>\n\n\
<all_options>\n{options}\n</all_options>\n\n\
Write 2-3 short paragraphs: why it serves the conversation, which metrics it is strongest on, \
and how it compares to the alternatives.",
        goal_block(goal),
        summary.selected_response,
        summary.selected_score,
        summary.selected_visits,
    )
}

/// Render a conversation as a plain transcript for judge-style prompts
pub fn transcript(conversation: &[Message]) -> String {
    conversation
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str().to_uppercase(), m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)```(?:json)?(.*?)```").ok()).as_ref()
}

/// Parse a JSON object from model output, unwrapping a markdown code fence if present
pub fn extract_json(text: &str) -> Result<Value> {
    let fenced = fence_regex().and_then(|re| re.captures(text)).and_then(|c| c.get(1));
    let body = match fenced {
        Some(m) => m.as_str().trim(),
        None => text.trim(),
    };
    serde_json::from_str(body).map_err(|e| GenerationError::InvalidResponse(format!("expected JSON: {e}")))
}

/// Pull the `response` string out of a branch reply
pub fn parse_branch(text: &str) -> Result<String> {
    let value = extract_json(text)?;
    value
        .get("response")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| GenerationError::InvalidResponse("missing \"response\" field".to_string()))
}
