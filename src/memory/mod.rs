
use serde::{Deserialize, Serialize};

/// Who produced a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Human,
    Assistant,
}

/// One message in a stored conversation, tagged by speaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    #[inline]
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Human,
            text: text.into(),
        }
    }

    #[inline]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One entry of the message list sent to a chat call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Per-session conversation memory, one explicit schema per memory kind.
///
/// `PlainTurns` keeps the verbatim transcript; `Summary` keeps a rolling
/// summary that is replaced on each exchange and is lossy by design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Memory {
    PlainTurns { turns: Vec<Turn> },
    Summary { summary: String },
}

impl Memory {
    #[inline]
    pub fn empty_turns() -> Self {
        Memory::PlainTurns { turns: Vec::new() }
    }

    #[inline]
    pub fn empty_summary() -> Self {
        Memory::Summary {
            summary: String::new(),
        }
    }
}

/// Convert stored turns to the ordered message list a chat call expects.
///
/// Length- and order-preserving; a human turn maps to the user role and any
/// other speaker maps to the assistant role. An empty transcript yields an
/// empty message list.
#[inline]
pub fn to_messages(turns: &[Turn]) -> Vec<ChatMessage> {
    turns
        .iter()
        .map(|turn| match turn.speaker {
            Speaker::Human => ChatMessage::user(turn.text.clone()),
            Speaker::Assistant => ChatMessage::assistant(turn.text.clone()),
        })
        .collect()
}

/// Produce the two turns a completed exchange appends, human first.
#[inline]
pub fn from_exchange(question: &str, answer: &str) -> [Turn; 2] {
    [Turn::human(question), Turn::assistant(answer)]
}

/// Render turns as "Human:"/"Assistant:" transcript lines for prompt text
#[inline]
pub fn render_history(turns: &[Turn]) -> String {
    let mut lines = Vec::with_capacity(turns.len());
    for turn in turns {
        let prefix = match turn.speaker {
            Speaker::Human => "Human",
            Speaker::Assistant => "Assistant",
        };
        lines.push(format!("{}: {}", prefix, turn.text));
    }
    lines.join("\n")
}

/// Render the lines of a fresh exchange for the summary fold
#[inline]
pub fn exchange_lines(question: &str, answer: &str) -> String {
    format!("Human: {}\nAssistant: {}", question, answer)
}

/// Prompt for a conversational completion over a rendered history
#[inline]
pub fn conversation_prompt(history: &str, input: &str) -> String {
    format!(
        "The following is a friendly conversation between a human and an AI. \
         The AI is talkative and provides lots of specific details from its context. \
         If the AI does not know the answer to a question, it truthfully says it does not know.\n\
         Current conversation:\n{}\nHuman: {}\nAI:",
        history, input
    )
}

/// Prompt that folds the lines of a new exchange into the previous summary.
///
/// The caller makes the single auxiliary model call and stores the result in
/// place of the old summary.
#[inline]
pub fn summary_prompt(current_summary: &str, new_lines: &str) -> String {
    format!(
        "Progressively summarize the lines of conversation provided, adding onto \
         the previous summary returning a new summary.\n\
         \n\
         EXAMPLE\n\
         Current summary:\n\
         The human asks what the AI thinks of artificial intelligence. The AI thinks \
         artificial intelligence is a force for good.\n\
         \n\
         New lines of conversation:\n\
         Human: Why do you think artificial intelligence is a force for good?\n\
         AI: Because artificial intelligence will help humans reach their full potential.\n\
         \n\
         New summary:\n\
         The human asks what the AI thinks of artificial intelligence. The AI thinks \
         artificial intelligence is a force for good because it will help humans reach \
         their full potential.\n\
         END OF EXAMPLE\n\
         \n\
         Current summary:\n\
         {}\n\
         \n\
         New lines of conversation:\n\
         {}\n\
         \n\
         New summary:",
        current_summary, new_lines
    )
}
