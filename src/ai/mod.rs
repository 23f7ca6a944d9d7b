//! AI chat assistant: a thin proxy that forwards a user message, a summary of
//! their training data and recent conversation turns to a hosted model.

pub mod client;
pub mod history;
pub mod prompts;
pub mod proxy;
pub mod rate_limit;
pub mod server;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::types::Units;

pub use client::{AnthropicClient, Completion, LlmClient};
pub use history::{ChatHistory, HISTORY_CAPACITY, HistoryMessage};
pub use proxy::{ChatProxy, MAX_HISTORY_TURNS, MAX_MESSAGE_CHARS};
pub use rate_limit::RateLimiter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum AiFeature {
    RoutineSuggestion,
    WorkoutAnalysis,
    FormTips,
    #[default]
    GeneralQa,
}

impl AiFeature {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiFeature::RoutineSuggestion => "routine-suggestion",
            AiFeature::WorkoutAnalysis => "workout-analysis",
            AiFeature::FormTips => "form-tips",
            AiFeature::GeneralQa => "general-qa",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Training data summarised for the model. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserContext {
    pub profile: Option<ProfileContext>,
    pub recent_workouts: Vec<WorkoutContext>,
    pub exercises: Vec<ExerciseContext>,
    pub routines: Vec<RoutineContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileContext {
    pub experience_level: String,
    pub primary_goal: String,
    pub current_weight: Option<f64>,
    pub height: Option<f64>,
    #[serde(default)]
    pub preferred_units: Units,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutContext {
    pub name: String,
    pub date: String,
    pub exercises: Vec<WorkoutExerciseContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutExerciseContext {
    pub name: String,
    pub sets: usize,
    pub reps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseContext {
    pub name: String,
    pub muscle_group: String,
    pub difficulty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineContext {
    pub name: String,
    pub exercises: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub feature: AiFeature,
    #[serde(default)]
    pub context: Option<UserContext>,
    #[serde(default)]
    pub conversation_history: Vec<Turn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: String,
    pub message_id: String,
    pub usage: Usage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_feature_and_history() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(req.feature, AiFeature::GeneralQa);
        assert!(req.context.is_none());
        assert!(req.conversation_history.is_empty());

        let req: ChatRequest = serde_json::from_str(
            r#"{"message":"m","feature":"form-tips","conversationHistory":[{"role":"assistant","content":"a"}]}"#,
        )
        .unwrap();
        assert_eq!(req.feature, AiFeature::FormTips);
        assert_eq!(req.conversation_history, vec![Turn::assistant("a")]);
    }

    #[test]
    fn response_uses_camel_case() {
        let res = ChatResponse {
            message: "ok".into(),
            message_id: "msg_1".into(),
            usage: Usage {
                input_tokens: 3,
                output_tokens: 4,
            },
        };
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["messageId"], "msg_1");
        assert_eq!(json["usage"]["outputTokens"], 4);
    }
}
