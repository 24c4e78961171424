//! Prompt assembly for the chat endpoint.

pub const SYSTEM_FRAMING: &str = "You are LunaChat, a conversational AI assistant.";

/// Compose the single generation prompt: system framing, retrieved context,
/// conversation transcript, then the new question with a trailing
/// "Assistant:" cue.
pub fn build_prompt(context: &str, transcript: &str, question: &str) -> String {
    format!(
        "{}\n\nRelevant retrieved context:\n{}\n\nConversation history:\n{}\n\nUser: {}\n\nAssistant:",
        SYSTEM_FRAMING, context, transcript, question
    )
}
