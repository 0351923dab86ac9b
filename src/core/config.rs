use std::env;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SUMMARY_LENGTH: usize = 500;
pub const DEFAULT_MAX_SUMMARY_LENGTH: usize = 2000;
pub const DEFAULT_MAX_MESSAGES_PER_SUMMARY: usize = 1000;
pub const DEFAULT_MAX_AUTO_SUMMARY_THRESHOLD: usize = 500;
pub const DEFAULT_ASK_TRIGGER: &str = "!ask";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub slack_bot_token: String,
    /// App-level token used to open the Socket Mode connection.
    pub slack_app_token: String,
    pub openai_api_key: String,
    pub openai_org_id: Option<String>,
    pub openai_model: Option<String>,
    pub limits: SummaryLimits,
    pub ask_trigger: String,
}

/// Defaults and operator ceilings applied to every summary request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryLimits {
    pub default_summary_length: usize,
    pub max_summary_length: usize,
    pub max_messages_per_summary: usize,
    pub max_auto_summary_threshold: usize,
}

impl Default for SummaryLimits {
    fn default() -> Self {
        Self {
            default_summary_length: DEFAULT_SUMMARY_LENGTH,
            max_summary_length: DEFAULT_MAX_SUMMARY_LENGTH,
            max_messages_per_summary: DEFAULT_MAX_MESSAGES_PER_SUMMARY,
            max_auto_summary_threshold: DEFAULT_MAX_AUTO_SUMMARY_THRESHOLD,
        }
    }
}

impl SummaryLimits {
    /// Keeps the ceilings at least 1 and the default length under its ceiling.
    #[must_use]
    pub fn normalized(self) -> Self {
        let max_summary_length = self.max_summary_length.max(1);
        Self {
            default_summary_length: self.default_summary_length.clamp(1, max_summary_length),
            max_summary_length,
            max_messages_per_summary: self.max_messages_per_summary.max(1),
            max_auto_summary_threshold: self.max_auto_summary_threshold.max(1),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes `std::env`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| format!("{key}: environment variable not found"))
        };
        let number = |key: &str, default: usize| -> Result<usize, String> {
            match lookup(key) {
                Some(raw) if !raw.trim().is_empty() => raw
                    .trim()
                    .parse::<usize>()
                    .map_err(|e| format!("{key}: {e}")),
                _ => Ok(default),
            }
        };

        let limits = SummaryLimits {
            default_summary_length: number("DEFAULT_SUMMARY_LENGTH", DEFAULT_SUMMARY_LENGTH)?,
            max_summary_length: number("MAX_SUMMARY_LENGTH", DEFAULT_MAX_SUMMARY_LENGTH)?,
            max_messages_per_summary: number(
                "MAX_MESSAGES_PER_SUMMARY",
                DEFAULT_MAX_MESSAGES_PER_SUMMARY,
            )?,
            max_auto_summary_threshold: number(
                "MAX_AUTO_SUMMARY_THRESHOLD",
                DEFAULT_MAX_AUTO_SUMMARY_THRESHOLD,
            )?,
        }
        .normalized();

        let ask_trigger = lookup("ASK_TRIGGER")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_ASK_TRIGGER.to_string());

        Ok(Self {
            slack_bot_token: required("SLACK_BOT_TOKEN")?,
            slack_app_token: required("SLACK_APP_TOKEN")?,
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_org_id: lookup("OPENAI_ORG_ID"),
            openai_model: lookup("OPENAI_MODEL"),
            limits,
            ask_trigger,
        })
    }

    #[must_use]
    pub fn model_name(&self) -> String {
        self.openai_model
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string())
    }
}
