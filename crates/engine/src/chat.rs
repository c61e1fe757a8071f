use std::collections::VecDeque;

use crate::net::chat_packet;

/// Target id addressing every local session.
pub const BROADCAST: u32 = 0;

const MAX_PENDING: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// [`BROADCAST`] or a client id.
    pub target: u32,
    /// Complete encoded chat packet.
    pub packet: Vec<u8>,
}

impl ChatMessage {
    pub fn server_notice(target: u32, text: &str) -> Self {
        Self {
            target,
            packet: chat_packet(text.as_bytes()),
        }
    }

    pub fn is_for(&self, client_id: u32) -> bool {
        self.target == BROADCAST || self.target == client_id
    }
}

/// Server notices waiting for the next distribution pass.
#[derive(Debug, Default)]
pub struct ChatQueue {
    pending: VecDeque<ChatMessage>,
}

impl ChatQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        if self.pending.len() == MAX_PENDING {
            log::debug!("chat queue full, dropping oldest notice");
            self.pending.pop_front();
        }
        self.pending.push_back(message);
    }

    /// Hands out everything queued so far. Each message is taken exactly once.
    pub fn take(&mut self) -> Vec<ChatMessage> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{read_fixed, HEADER_SIZE};

    #[test]
    fn test_take_empties_queue() {
        let mut queue = ChatQueue::new();
        queue.push(ChatMessage::server_notice(BROADCAST, "ABC has left"));
        queue.push(ChatMessage::server_notice(7, "hello"));

        let taken = queue.take();
        assert_eq!(taken.len(), 2);
        assert!(queue.take().is_empty());
        assert_eq!(read_fixed(&taken[0].packet[HEADER_SIZE..]), "ABC has left");
    }

    #[test]
    fn test_targeting() {
        let all = ChatMessage::server_notice(BROADCAST, "x");
        let one = ChatMessage::server_notice(7, "x");
        assert!(all.is_for(3));
        assert!(one.is_for(7));
        assert!(!one.is_for(3));
    }

    #[test]
    fn test_bounded() {
        let mut queue = ChatQueue::new();
        for i in 0..MAX_PENDING + 4 {
            queue.push(ChatMessage::server_notice(i as u32 + 1, "x"));
        }
        assert_eq!(queue.len(), MAX_PENDING);
        assert_eq!(queue.take()[0].target, 5);
    }
}
