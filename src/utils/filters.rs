use slack_morphism::SlackHistoryMessage;

use crate::commands::SUMMARY_COMMAND;
use crate::core::models::{PlatformMessage, Sender};

/// Placeholder used for messages that carry no text (media, stickers).
pub const NO_TEXT_SENTINEL: &str = "<no text>";

/// Trimmed message text, with missing text mapped to [`NO_TEXT_SENTINEL`].
#[must_use]
pub fn stripped_text(text: Option<&str>) -> &str {
    text.unwrap_or(NO_TEXT_SENTINEL).trim()
}

/// True when there is nothing worth summarizing in `stripped`.
#[must_use]
pub fn is_blank(stripped: &str) -> bool {
    stripped.is_empty() || stripped == NO_TEXT_SENTINEL
}

#[must_use]
pub fn format_entry(sender_name: &str, text: &str) -> String {
    format!("{sender_name}: {text}")
}

/// Keeps history messages that should go into a range summary: drops blank
/// messages and earlier `/summary` invocations, preserving order.
#[must_use]
pub fn summarizable_messages(messages: Vec<PlatformMessage>) -> Vec<PlatformMessage> {
    messages
        .into_iter()
        .filter(|msg| {
            let stripped = stripped_text(msg.text.as_deref());
            !is_blank(stripped) && !stripped.starts_with(SUMMARY_COMMAND)
        })
        .collect()
}

/// Converts a Slack history entry into a platform message. Every sender is
/// kept, bots and integrations included; the author falls back from user id
/// to bot id.
#[must_use]
pub fn history_to_platform_message(msg: SlackHistoryMessage) -> PlatformMessage {
    let id = msg
        .sender
        .user
        .map(|user| user.0)
        .or_else(|| msg.sender.bot_id.map(|bot| bot.0))
        .unwrap_or_default();
    PlatformMessage {
        sender: Sender::new(id, msg.sender.username),
        text: msg.content.text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: Option<&str>) -> PlatformMessage {
        PlatformMessage {
            sender: Sender::new("U1", None),
            text: text.map(str::to_string),
        }
    }

    #[test]
    fn missing_text_becomes_sentinel() {
        assert_eq!(stripped_text(None), NO_TEXT_SENTINEL);
        assert!(is_blank(stripped_text(None)));
        assert!(is_blank(stripped_text(Some("   "))));
        assert_eq!(stripped_text(Some("  hi \n")), "hi");
    }

    #[test]
    fn summarizable_messages_drops_commands_and_blanks() {
        let kept = summarizable_messages(vec![
            msg(Some("hello")),
            msg(Some("  /summary 5")),
            msg(None),
            msg(Some("")),
            msg(Some("/setautosummary 3")),
            msg(Some("bye")),
        ]);
        let texts: Vec<_> = kept.iter().filter_map(|m| m.text.as_deref()).collect();
        assert_eq!(texts, vec!["hello", "/setautosummary 3", "bye"]);
    }

    fn history(value: serde_json::Value) -> SlackHistoryMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn history_keeps_bot_and_integration_posts() {
        let kept: Vec<PlatformMessage> = vec![
            history(serde_json::json!({ "ts": "1.0", "user": "U1", "text": "human line" })),
            history(serde_json::json!({
                "ts": "2.0",
                "bot_id": "B1",
                "username": "github",
                "subtype": "bot_message",
                "text": "PR #12 merged"
            })),
            history(serde_json::json!({
                "ts": "3.0",
                "user": "U2",
                "bot_id": "B2",
                "text": "deploy bot says release done"
            })),
        ]
        .into_iter()
        .map(history_to_platform_message)
        .collect();

        let texts: Vec<_> = kept.iter().filter_map(|m| m.text.as_deref()).collect();
        assert_eq!(
            texts,
            vec!["human line", "PR #12 merged", "deploy bot says release done"]
        );
        assert_eq!(kept[1].sender.id, "B1");
        assert_eq!(kept[1].sender.display_name(), "github");
        assert_eq!(kept[2].sender.id, "U2");
    }
}
