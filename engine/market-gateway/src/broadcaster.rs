//! Per-participant fan-out of market messages

use crate::error::GatewayResult;
use crate::messages::OutboundMessage;
use auction::ParticipantId;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Messages produced by one market event, keyed by recipient
pub type Broadcast = BTreeMap<ParticipantId, OutboundMessage>;

/// Broadcaster that delivers serialized messages to connected participants
#[derive(Default)]
pub struct Broadcaster {
    /// Connected participants (participant_id -> channel sender)
    clients: RwLock<HashMap<ParticipantId, UnboundedSender<String>>>,
}

impl Broadcaster {
    /// Create a new broadcaster
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a participant to receive updates, replacing any previous connection
    pub fn add_client(&self, participant_id: ParticipantId, sender: UnboundedSender<String>) {
        self.clients.write().insert(participant_id, sender);
    }

    /// Open a fresh channel for a participant and return its receiving end
    pub fn subscribe(&self, participant_id: ParticipantId) -> UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.add_client(participant_id, tx);
        rx
    }

    /// Remove a participant
    pub fn remove_client(&self, participant_id: ParticipantId) {
        self.clients.write().remove(&participant_id);
    }

    /// Get the number of connected participants
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Deliver each message to its recipient. Returns how many were delivered.
    ///
    /// Recipients without a connection are skipped; closed connections are dropped.
    pub fn publish(&self, broadcast: &Broadcast) -> GatewayResult<usize> {
        if broadcast.is_empty() {
            return Ok(0);
        }

        let mut delivered = 0;
        let mut failed_clients = Vec::new();
        {
            let clients = self.clients.read();
            for (participant_id, message) in broadcast {
                let Some(sender) = clients.get(participant_id) else { continue };
                let text = message.to_json()?;
                if sender.send(text).is_ok() {
                    delivered += 1;
                } else {
                    failed_clients.push(*participant_id);
                }
            }
        }

        // Remove failed clients
        if !failed_clients.is_empty() {
            let mut clients = self.clients.write();
            for participant_id in failed_clients {
                tracing::debug!(participant = participant_id, "dropping closed connection");
                clients.remove(&participant_id);
            }
        }

        Ok(delivered)
    }
}
