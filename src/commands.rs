//! Command grammar recognised in message text.
//!
//! Patterns are anchored to the whole message and case-sensitive. Numeric
//! arguments are captured as raw digit strings; turning them into numbers
//! (with fallbacks) is the orchestrator's job.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::BotError;

pub const SUMMARY_COMMAND: &str = "/summary";
pub const SET_AUTO_SUMMARY_COMMAND: &str = "/setautosummary";
pub const STOP_AUTO_SUMMARY_COMMAND: &str = "/stopautosummary";

static SUMMARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^/summary\s+(\d+)(?:\s+(\d+))?(?:\s+(.+))?$").expect("static regex compile")
});
static STOP_AUTO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/stopautosummary$").expect("static regex compile"));
static SET_AUTO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/setautosummary\s+(\d+)$").expect("static regex compile"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Summary {
        count: String,
        length: Option<String>,
        extra_context: Option<String>,
    },
    StopAutoSummary,
    SetAutoSummary {
        count: String,
    },
    Ask {
        question: String,
    },
}

#[derive(Debug, Clone)]
pub struct CommandParser {
    ask_trigger: String,
    ask_re: Regex,
}

impl CommandParser {
    /// # Errors
    ///
    /// Returns an error if the trigger is blank.
    pub fn new(ask_trigger: &str) -> Result<Self, BotError> {
        let ask_trigger = ask_trigger.trim();
        if ask_trigger.is_empty() {
            return Err(BotError::ConfigError(
                "ask trigger must not be empty".to_string(),
            ));
        }
        let ask_re = Regex::new(&format!(r"(?s)^{}\s+(.+)$", regex::escape(ask_trigger)))
            .map_err(|e| BotError::ConfigError(format!("invalid ask trigger: {e}")))?;
        Ok(Self {
            ask_trigger: ask_trigger.to_string(),
            ask_re,
        })
    }

    #[must_use]
    pub fn ask_trigger(&self) -> &str {
        &self.ask_trigger
    }

    #[must_use]
    pub fn parse(&self, text: &str) -> Option<Command> {
        if let Some(cap) = SUMMARY_RE.captures(text) {
            return Some(Command::Summary {
                count: cap[1].to_string(),
                length: cap.get(2).map(|m| m.as_str().to_string()),
                extra_context: cap
                    .get(3)
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|s| !s.is_empty()),
            });
        }
        if STOP_AUTO_RE.is_match(text) {
            return Some(Command::StopAutoSummary);
        }
        if let Some(cap) = SET_AUTO_RE.captures(text) {
            return Some(Command::SetAutoSummary {
                count: cap[1].to_string(),
            });
        }
        self.ask_re.captures(text).map(|cap| Command::Ask {
            question: cap[1].trim().to_string(),
        })
    }

    /// True for text the passive collector must not buffer: slash commands
    /// and ask invocations. The trigger only counts as a whole word, so
    /// `!askew` is ordinary text.
    #[must_use]
    pub fn is_command_like(&self, stripped: &str) -> bool {
        if stripped.starts_with('/') {
            return true;
        }
        stripped
            .strip_prefix(self.ask_trigger.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> CommandParser {
        CommandParser::new("!ask").unwrap()
    }

    #[test]
    fn summary_captures_all_groups() {
        assert_eq!(
            parser().parse("/summary 20 300 focus on the release"),
            Some(Command::Summary {
                count: "20".into(),
                length: Some("300".into()),
                extra_context: Some("focus on the release".into()),
            })
        );
    }

    #[test]
    fn summary_context_without_length() {
        assert_eq!(
            parser().parse("/summary 20 budget talk"),
            Some(Command::Summary {
                count: "20".into(),
                length: None,
                extra_context: Some("budget talk".into()),
            })
        );
    }

    #[test]
    fn ask_trigger_is_escaped() {
        let parser = CommandParser::new("?q").unwrap();
        assert_eq!(
            parser.parse("?q what time?"),
            Some(Command::Ask {
                question: "what time?".into()
            })
        );
        assert_eq!(parser.parse("q what time?"), None);
    }

    #[test]
    fn blank_trigger_is_rejected() {
        assert!(CommandParser::new("  ").is_err());
    }
}
