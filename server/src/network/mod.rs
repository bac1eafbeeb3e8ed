//! Networking: the UDP server and the per-character send capability the
//! world uses to reach clients.

mod server;

pub use server::Server;

use realm_shared::{PlayerId, ServerMessage};

/// Per-character message delivery
pub trait Transport {
    fn send(&mut self, to: PlayerId, msg: ServerMessage);
}

/// Messages queued during a tick, in send order. The server drains it into
/// client queues after the world has run.
#[derive(Debug, Default)]
pub struct Outbox {
    queued: Vec<(PlayerId, ServerMessage)>,
}

impl Outbox {
    pub fn drain(&mut self) -> Vec<(PlayerId, ServerMessage)> {
        std::mem::take(&mut self.queued)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Everything sent to `id`, oldest first
    #[cfg(test)]
    pub fn messages_for(&self, id: PlayerId) -> Vec<&ServerMessage> {
        self.queued
            .iter()
            .filter(|(to, _)| *to == id)
            .map(|(_, msg)| msg)
            .collect()
    }

    #[cfg(test)]
    pub fn recipients(&self) -> Vec<PlayerId> {
        self.queued.iter().map(|(to, _)| *to).collect()
    }
}

impl Transport for Outbox {
    fn send(&mut self, to: PlayerId, msg: ServerMessage) {
        self.queued.push((to, msg));
    }
}
