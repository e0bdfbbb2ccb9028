//! Command handling: validated dispatch into the counter store and persona.
//!
//! Each method maps one chat command to a `Reply` the front end renders.
//! Validation failures become error replies, not `Err`: the command was
//! understood and rejected. Store faults and persona faults the command
//! cannot degrade around surface as `Err`.

use crate::cowsay::CowFormatter;
use crate::error::BotError;
use critter_core::{CommandRouter, Mood, ValidationError};
use critter_llm::ChatProvider;
use critter_store::CounterStore;
use rand::seq::IndexedRandom;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const SESSION_COLOR: u32 = 0xA2C4C9;
const ERROR_COLOR: u32 = 0xCC0000;
const SOUNDS_ON_COLOR: u32 = 0x2ECC71;
const SOUNDS_OFF_COLOR: u32 = 0xE74C3C;

const HAPPY_EMOJI: &[&str] = &[
    "😀", "😁", "😃", "😄", "😆", "😉", "😊", "😋", "😎", "😍", "🙂", "🤗", "🤩", "😏",
];
const SAD_EMOJI: &[&str] = &[
    "😞", "😒", "😟", "😠", "🙁", "😣", "😖", "😨", "😰", "😧", "😢", "😥", "😭",
];

fn pick_emoji(mood: Mood) -> &'static str {
    let pool = match mood {
        Mood::Happy => HAPPY_EMOJI,
        Mood::Sad => SAD_EMOJI,
    };
    pool.choose(&mut rand::rng()).copied().unwrap_or("🙂")
}

/// A platform-agnostic reply. The front end decides how titles, colors,
/// and attachments are actually rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub title: String,
    pub body: String,
    pub color: Option<u32>,
    pub image: Option<PathBuf>,
    pub sound: Option<PathBuf>,
}

impl Reply {
    fn plain(body: String) -> Self {
        Self {
            title: String::new(),
            body,
            color: None,
            image: None,
            sound: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.color == Some(ERROR_COLOR)
    }
}

/// Names in some servers arrive as `"name (nickname)"`; keep the name.
pub fn display_author(raw: &str) -> String {
    raw.split('(').next().unwrap_or_default().trim().to_string()
}

fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct CommandHandler {
    router: CommandRouter,
    store: CounterStore,
    chat: Arc<dyn ChatProvider>,
    cow: CowFormatter,
    session_cell: String,
    warning_image: PathBuf,
    sounds_enabled: AtomicBool,
}

impl CommandHandler {
    pub fn new(
        router: CommandRouter,
        store: CounterStore,
        chat: Arc<dyn ChatProvider>,
        cow: CowFormatter,
        session_cell: impl Into<String>,
        warning_image: PathBuf,
    ) -> Self {
        Self {
            router,
            store,
            chat,
            cow,
            session_cell: session_cell.into(),
            warning_image,
            sounds_enabled: AtomicBool::new(false),
        }
    }

    /// `$session <campaign>` - bump the campaign's session number.
    pub async fn session(&self, campaign: &str) -> Result<Reply, BotError> {
        let group = match self.router.resolve_session_target(campaign) {
            Ok(group) => group,
            Err(error) => return Ok(self.validation_reply(&error)),
        };
        let number = self.store.increment(&group, &self.session_cell).await?;
        tracing::info!(campaign = %group, number, "session incremented");
        Ok(Reply {
            title: format!("Session number is now {}", number),
            body: String::new(),
            color: Some(SESSION_COLOR),
            image: None,
            sound: None,
        })
    }

    /// `$add <crit type> <character>` - log one crit and reply with the
    /// new tally, a persona comment when one can be had, and the metric's
    /// presentation assets.
    pub async fn add(&self, metric_key: &str, subject: &str, author: &str) -> Result<Reply, BotError> {
        tracing::info!(metric_key, subject, author, "add command received");
        let target = match self.router.resolve(subject, metric_key) {
            Ok(target) => target,
            Err(error) => return Ok(self.validation_reply(&error)),
        };

        let count = self.store.increment(&target.group, &target.address).await?;
        let display_name = title_case(&target.entity_name);

        let comment = self
            .persona_comment(
                author,
                &format!(
                    "{} rolled a Nat {}! They now have {}!",
                    display_name, target.metric_key, count
                ),
            )
            .await;

        let title = target
            .metric
            .title
            .replace("{emoji}", pick_emoji(target.metric.mood));
        let mut body = format!(
            "{} now has {} Nat {}s!",
            display_name, count, target.metric_key
        );
        if let Some(comment) = comment {
            body.push_str("\n```\n");
            body.push_str(comment.trim_end());
            body.push_str("\n```");
        }

        Ok(Reply {
            title,
            body,
            color: Some(target.entity.color),
            image: Some(target.metric.image.clone()),
            sound: self
                .sounds_enabled()
                .then(|| target.metric.sound.clone()),
        })
    }

    /// `$sounds <on|off>` - toggle sound attachments on crit replies.
    pub fn sounds(&self, status: &str) -> Reply {
        match status {
            "on" => {
                self.sounds_enabled.store(true, Ordering::Relaxed);
                tracing::info!("sounds enabled");
                Reply {
                    title: "Sounds on!".to_string(),
                    body: String::new(),
                    color: Some(SOUNDS_ON_COLOR),
                    image: None,
                    sound: None,
                }
            }
            "off" => {
                self.sounds_enabled.store(false, Ordering::Relaxed);
                tracing::info!("sounds disabled");
                Reply {
                    title: "Sounds off!".to_string(),
                    body: String::new(),
                    color: Some(SOUNDS_OFF_COLOR),
                    image: None,
                    sound: None,
                }
            }
            other => {
                tracing::warn!(status = other, "invalid sounds status");
                self.error_reply(format!(
                    "Received {}, which is not a valid status. Please try again.",
                    other
                ))
            }
        }
    }

    /// `$cowsay [message]` - format a message as a speaking cow.
    pub async fn cowsay(&self, message: Option<&str>) -> Result<Reply, BotError> {
        let formatted = self.cow.format(message).await?;
        Ok(Reply::plain(fenced(&formatted)))
    }

    /// `$cowchat [message]` - one turn of conversation with the persona,
    /// rendered through cowsay. Bare `$cowchat` is just a blank stare.
    pub async fn cowchat(&self, message: Option<&str>, author: &str) -> Result<Reply, BotError> {
        let message = match message {
            Some(text) if !text.trim().is_empty() => text,
            _ => return self.cowsay(None).await,
        };
        let response = self
            .chat
            .send_message(&format!("From {}: {}", author, message))
            .await?;
        let formatted = self.cow.format(Some(&response)).await?;
        Ok(Reply::plain(fenced(&formatted)))
    }

    pub fn sounds_enabled(&self) -> bool {
        self.sounds_enabled.load(Ordering::Relaxed)
    }

    /// Ask the persona to comment and cowsay the result. Both collaborators
    /// are best-effort here: any failure degrades to no comment or to the
    /// bare, unformatted reply.
    async fn persona_comment(&self, author: &str, message: &str) -> Option<String> {
        let prompt = format!("From {}: {}", author, message);
        let response = match self.chat.send_message(&prompt).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(error = %error, "persona comment failed");
                return None;
            }
        };
        match self.cow.format(Some(&response)).await {
            Ok(formatted) => Some(formatted),
            Err(error) => {
                tracing::warn!(error = %error, "cowsay formatting failed");
                Some(response)
            }
        }
    }

    fn validation_reply(&self, error: &ValidationError) -> Reply {
        tracing::warn!(error = %error, "command rejected");
        let message = match error {
            ValidationError::UnknownEntity(name) => format!(
                "Received {}, which is not a valid character name. Please try again.",
                name
            ),
            ValidationError::UnknownMetric(key) => format!(
                "Received {}, which is not a valid crit type. Please try again.",
                key
            ),
            ValidationError::UnknownCampaign(name) => format!(
                "Received {}, which is not a valid campaign name. Please try again.",
                name
            ),
        };
        self.error_reply(message)
    }

    fn error_reply(&self, message: String) -> Reply {
        Reply {
            title: "Error".to_string(),
            body: message,
            color: Some(ERROR_COLOR),
            image: Some(self.warning_image.clone()),
            sound: None,
        }
    }
}

fn fenced(text: &str) -> String {
    format!("```\n{}\n```", text.trim_end())
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("session_cell", &self.session_cell)
            .field("sounds_enabled", &self.sounds_enabled())
            .finish()
    }
}
