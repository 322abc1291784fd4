//! Prompt classification and the sampling table keyed by it.

use serde::{Deserialize, Serialize};
use std::fmt;

const CODING_KEYWORDS: &[&str] = &[
    "build", "create", "make", "code", "app", "html", "css", "javascript", "js", "function",
    "fix", "bug", "component", "page", "website", "game", "button", "form", "add", "implement",
];

const REASONING_KEYWORDS: &[&str] = &[
    "why", "explain", "compare", "analyze", "analyse", "plan", "architecture", "tradeoff",
    "tradeoffs", "pros", "cons", "reason", "think", "evaluate", "strategy",
];

/// What kind of answer a prompt is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskMode {
    Coding,
    Reasoning,
    Chat,
}

impl TaskMode {
    /// Keyword heuristic. Extended think mode always selects `Reasoning`.
    pub fn classify(prompt: &str, extra_think_mode: bool) -> Self {
        if extra_think_mode {
            return Self::Reasoning;
        }

        let lower = prompt.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let count = |keywords: &[&str]| words.iter().filter(|w| keywords.contains(w)).count();

        let coding = count(CODING_KEYWORDS);
        let reasoning = count(REASONING_KEYWORDS);

        if coding == 0 && reasoning == 0 {
            Self::Chat
        } else if reasoning > coding {
            Self::Reasoning
        } else {
            Self::Coding
        }
    }

    /// Sampling parameters for this mode.
    pub fn sampling(self) -> SamplingConfig {
        match self {
            Self::Coding => SamplingConfig {
                temperature: 0.4,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: 8192,
                candidate_count: 1,
            },
            Self::Reasoning => SamplingConfig {
                temperature: 0.7,
                top_k: 64,
                top_p: 0.95,
                max_output_tokens: 8192,
                candidate_count: 1,
            },
            Self::Chat => SamplingConfig {
                temperature: 0.9,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: 2048,
                candidate_count: 1,
            },
        }
    }
}

impl fmt::Display for TaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Coding => "coding",
            Self::Reasoning => "reasoning",
            Self::Chat => "chat",
        })
    }
}

/// Generation parameters sent with each request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub candidate_count: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        TaskMode::Coding.sampling()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            TaskMode::classify("Build a todo app with dark mode", false),
            TaskMode::Coding
        );
        assert_eq!(
            TaskMode::classify("Why would I compare these approaches?", false),
            TaskMode::Reasoning
        );
        assert_eq!(TaskMode::classify("hello there", false), TaskMode::Chat);
        assert_eq!(TaskMode::classify("hello there", true), TaskMode::Reasoning);
    }

    #[test]
    fn test_sampling_table() {
        assert!(TaskMode::Coding.sampling().temperature < TaskMode::Chat.sampling().temperature);
        assert_eq!(TaskMode::Reasoning.sampling().max_output_tokens, 8192);
        assert_eq!(SamplingConfig::default(), TaskMode::Coding.sampling());
    }

    #[test]
    fn test_sampling_serializes_camel_case() {
        let json = serde_json::to_value(TaskMode::Chat.sampling()).unwrap();
        assert_eq!(json["topK"], 40);
        assert_eq!(json["maxOutputTokens"], 2048);
    }
}
