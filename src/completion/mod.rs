// Completion module
// Chat prompt types and the Azure OpenAI chat completion client


pub mod azure;

pub use azure::AzureOpenAiClient;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Messages sent in one completion call, plus optional generation settings.
///
/// Built fresh for every question and never stored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Prompt {
    pub messages: Vec<Message>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Prompt {
    /// Two messages: grounding text as the system message, then the question.
    #[inline]
    pub fn grounded(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![
                Message {
                    role: Role::System,
                    content: system.into(),
                },
                Message {
                    role: Role::User,
                    content: user.into(),
                },
            ],
            ..Self::default()
        }
    }

    /// The question alone, with no system message.
    #[inline]
    pub fn direct(user: impl Into<String>) -> Self {
        Self {
            messages: vec![Message {
                role: Role::User,
                content: user.into(),
            }],
            ..Self::default()
        }
    }

    #[inline]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[inline]
    pub fn system(&self) -> Option<&str> {
        self.content_of(Role::System)
    }

    #[inline]
    pub fn user(&self) -> Option<&str> {
        self.content_of(Role::User)
    }

    fn content_of(&self, role: Role) -> Option<&str> {
        self.messages
            .iter()
            .find(|message| message.role == role)
            .map(|message| message.content.as_str())
    }
}

/// Sends a prompt to a language model and returns the reply text.
pub trait Completer: Send + Sync {
    fn complete(&self, prompt: &Prompt) -> anyhow::Result<String>;
}
