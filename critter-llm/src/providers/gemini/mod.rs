//! Gemini-backed chat persona.

mod chat;
mod client;
mod types;

pub use chat::GeminiChat;
pub use client::GeminiClient;
