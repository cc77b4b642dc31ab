//! System prompt construction.

const BASE_INSTRUCTION: &str = "You are a helpful and knowledgeable AI parenting assistant. \
Provide evidence-based, compassionate, and practical parenting advice.";

const CONCISE_GUIDANCE: &str = " Keep your responses concise and to the point \
(2-3 paragraphs maximum). Focus on the most important actionable advice.";

const CONTEXT_HEADING: &str = "\n\nContext about the child(ren): ";

const DETAILED_GUIDANCE: &str =
    " Provide detailed, comprehensive advice tailored to the child's context.";

/// Build the system prompt for a request.
///
/// Without child context the assistant is asked for brief answers; with it,
/// the context items are listed and detailed advice is requested. Blank items
/// are ignored.
pub fn system_prompt(child_context: &[String]) -> String {
    let items: Vec<&str> = child_context
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .collect();

    if items.is_empty() {
        return format!("{BASE_INSTRUCTION}{CONCISE_GUIDANCE}");
    }

    format!(
        "{BASE_INSTRUCTION}{CONTEXT_HEADING}{}{DETAILED_GUIDANCE}",
        items.join(", ")
    )
}
