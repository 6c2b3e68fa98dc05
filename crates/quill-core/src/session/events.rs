//! Host notifications queued for the session's owning thread.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Something changed in the host world while a script was being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostEvent {
    ObjectRenamed { old_tag: String, new_tag: String },
    /// An object, or an area together with everything placed in it
    ObjectRemoved { tag: String },
    ConversationRemoved { conversation: String },
}

#[derive(Error, Debug)]
#[error("Session is gone; dropped {0:?}")]
pub struct SessionClosed(pub HostEvent);

/// Cloneable handle external bridges use from any thread.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: Sender<HostEvent>,
}

impl EventSender {
    pub fn send(&self, event: HostEvent) -> Result<(), SessionClosed> {
        self.sender.send(event).map_err(|e| SessionClosed(e.into_inner()))
    }
}

/// Single-consumer queue drained by the session that owns the tree.
#[derive(Debug)]
pub struct EventQueue {
    sender: Sender<HostEvent>,
    receiver: Receiver<HostEvent>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Everything queued so far, without blocking.
    pub fn drain(&self) -> Vec<HostEvent> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn events_from_other_threads_arrive_in_order() {
        let queue = EventQueue::new();
        let sender = queue.sender();
        let handle = thread::spawn(move || {
            for n in 0..3 {
                sender
                    .send(HostEvent::ObjectRemoved {
                        tag: format!("goblin_{n}"),
                    })
                    .unwrap();
            }
        });
        handle.join().unwrap();

        let events = queue.drain();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            HostEvent::ObjectRemoved {
                tag: "goblin_0".to_string()
            }
        );
        assert!(queue.is_empty());
    }
}
