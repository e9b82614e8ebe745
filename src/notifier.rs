//! Outbound notification delivery.
//!
//! The quest and event subsystems only decide *what* to tell whom; the
//! network layer drains the channel and encodes the messages.

use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::ServerMessage;

/// Fire-and-forget sender for client-facing messages.
pub trait Notifier: Send + Sync {
    /// Send a message to a single character
    fn send_to(&self, character_id: &str, message: ServerMessage);

    /// Send a message to every connected character
    fn broadcast(&self, message: ServerMessage);
}

/// Who an outbound message is addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Character(String),
    Everyone,
}

#[derive(Debug, Clone)]
pub struct Outbound {
    pub recipient: Recipient,
    pub message: ServerMessage,
}

/// Notifier that forwards messages over an unbounded channel.
#[derive(Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn push(&self, recipient: Recipient, message: ServerMessage) {
        let kind = message.type_name();
        if self.tx.send(Outbound { recipient, message }).is_err() {
            debug!("Dropped outbound {} message, receiver closed", kind);
        }
    }
}

impl Notifier for ChannelNotifier {
    fn send_to(&self, character_id: &str, message: ServerMessage) {
        self.push(Recipient::Character(character_id.to_string()), message);
    }

    fn broadcast(&self, message: ServerMessage) {
        self.push(Recipient::Everyone, message);
    }
}
