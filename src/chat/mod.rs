//! Chat side-channel: an independent question/answer transcript.
//!
//! Shares only the failure-to-fallback pattern with generation; it never
//! reads documents or touches playback.

pub mod channel;

pub use channel::{ChatChannel, ChatMessage, ChatRole, ChatTicket, TicketId};
