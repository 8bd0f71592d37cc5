//! Builds the chat-completion payload for each user action.

use crate::stream::{ChatMessage, ChatRequest};

/// Pane contents the chat action folds into its prompt.
pub struct ChatContext<'a> {
    pub previous_answer: &'a str,
    pub translation: &'a str,
    pub summary: &'a str,
}

pub fn translate_request(clipboard_text: &str, reply_lang: &str) -> ChatRequest {
    ChatRequest {
        messages: vec![
            ChatMessage::system(format!("Reply in {reply_lang}.")),
            ChatMessage::user(format!(
                "{clipboard_text}\n\nTranslate into {reply_lang}."
            )),
        ],
        stream: true,
    }
}

pub fn summarize_request(clipboard_text: &str, reply_lang: &str) -> ChatRequest {
    ChatRequest {
        messages: vec![
            ChatMessage::system(format!("Reply in {reply_lang}.")),
            ChatMessage::user(format!(
                "{clipboard_text}\n\nSummarize in {reply_lang}:"
            )),
        ],
        stream: true,
    }
}

/// Fold the non-empty panes and the typed text into the chat prompt.
pub fn compose_chat_input(ctx: &ChatContext, typed: &str, reply_lang: &str) -> String {
    let mut composed = String::from("Based on the following context:\n");
    if !ctx.previous_answer.trim().is_empty() {
        composed.push_str("Previous answer:\n");
        composed.push_str(ctx.previous_answer);
        composed.push('\n');
    }
    if !ctx.translation.trim().is_empty() {
        composed.push_str("Translation pane:\n");
        composed.push_str(ctx.translation);
        composed.push('\n');
    }
    if !ctx.summary.trim().is_empty() {
        composed.push_str("Summary pane:\n");
        composed.push_str(ctx.summary);
        composed.push('\n');
    }
    composed.push_str(typed);
    composed.push_str(&format!("\nReply in {reply_lang}."));
    composed
}

pub fn chat_request(composed_input: String) -> ChatRequest {
    ChatRequest {
        messages: vec![ChatMessage::user(composed_input)],
        stream: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_request_wraps_clipboard_text() {
        let req = translate_request("bonjour", "English");
        assert!(req.stream);
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, "system");
        assert!(req.messages[0].content.contains("English"));
        assert_eq!(req.messages[1].role, "user");
        assert!(req.messages[1].content.starts_with("bonjour"));
        assert!(req.messages[1].content.contains("Translate into English"));
    }

    #[test]
    fn summarize_request_wraps_clipboard_text() {
        let req = summarize_request("long article", "zh_TW");
        assert!(req.stream);
        assert!(req.messages[1].content.contains("Summarize in zh_TW"));
    }

    #[test]
    fn chat_input_skips_empty_panes() {
        let ctx = ChatContext {
            previous_answer: "",
            translation: "  ",
            summary: "",
        };
        let composed = compose_chat_input(&ctx, "what now?", "English");
        assert!(!composed.contains("Previous answer"));
        assert!(!composed.contains("Translation pane"));
        assert!(!composed.contains("Summary pane"));
        assert!(composed.contains("what now?"));
        assert!(composed.ends_with("Reply in English."));
    }

    #[test]
    fn chat_input_includes_populated_panes() {
        let ctx = ChatContext {
            previous_answer: "earlier reply",
            translation: "le chat",
            summary: "a cat story",
        };
        let composed = compose_chat_input(&ctx, "go on", "English");
        assert!(composed.contains("Previous answer:\nearlier reply"));
        assert!(composed.contains("Translation pane:\nle chat"));
        assert!(composed.contains("Summary pane:\na cat story"));
    }

    #[test]
    fn chat_request_is_a_single_user_message() {
        let req = chat_request("hello".to_string());
        assert!(req.stream);
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, "user");
    }
}
