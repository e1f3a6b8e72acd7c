//! Chat transcript and its request/reply bookkeeping.
//!
//! ```text
//! begin_send("how do I loop?") → user entry appended → ChatTicket
//!   (caller sends ticket.message to StudioService::chat)
//! complete(ticket, Ok(reply))  → assistant entry with reply
//! complete(ticket, Err(_))     → assistant entry with fallback text
//! ```
//!
//! Replies are appended in arrival order; there is no single-flight rule.

use std::collections::HashSet;
use std::fmt;

use crate::config::ChatConfig;
use crate::service::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn label(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TicketId(u64);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chat-{}", self.0)
    }
}

/// One outstanding question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTicket {
    pub id: TicketId,
    /// Text to send, as typed.
    pub message: String,
}

pub struct ChatChannel {
    transcript: Vec<ChatMessage>,
    fallback_reply: String,
    pending: HashSet<TicketId>,
    next_ticket: u64,
}

impl ChatChannel {
    /// A transcript seeded with the configured greeting, if any.
    pub fn new(config: &ChatConfig) -> Self {
        let mut transcript = Vec::new();
        if !config.greeting.trim().is_empty() {
            transcript.push(ChatMessage {
                role: ChatRole::Assistant,
                text: config.greeting.clone(),
            });
        }
        Self {
            transcript,
            fallback_reply: config.fallback_reply.clone(),
            pending: HashSet::new(),
            next_ticket: 1,
        }
    }

    /// Record the user's message and hand back the ticket to send.
    ///
    /// Empty or whitespace-only input is ignored and returns `None`; the
    /// caller must then issue no network call.  Otherwise the text is
    /// recorded and sent exactly as typed.
    pub fn begin_send(&mut self, text: &str) -> Option<ChatTicket> {
        if text.trim().is_empty() {
            return None;
        }
        self.transcript.push(ChatMessage {
            role: ChatRole::User,
            text: text.to_string(),
        });

        let id = TicketId(self.next_ticket);
        self.next_ticket += 1;
        self.pending.insert(id);
        log::debug!("chat: {id} sent ({} chars)", text.len());
        Some(ChatTicket {
            id,
            message: text.to_string(),
        })
    }

    /// Append the assistant's answer for `ticket`.  A failed call appends the
    /// fallback reply instead.  Unknown or already-completed tickets are
    /// ignored.
    pub fn complete(&mut self, ticket: TicketId, result: Result<String, ServiceError>) {
        if !self.pending.remove(&ticket) {
            log::warn!("chat: ignoring reply for unknown {ticket}");
            return;
        }
        let text = match result {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("chat: {ticket} failed: {e}");
                self.fallback_reply.clone()
            }
        };
        self.transcript.push(ChatMessage {
            role: ChatRole::Assistant,
            text,
        });
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Number of questions still awaiting a reply.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
