//! Logical inter-module messages.
//!
//! Messages are in-process values, not wire-encoded bytes: the simulated
//! world has no serialization layer. A message pairs a numeric kind (used by
//! handler registries for dispatch) with a shared, dynamically typed body.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Numeric message type identifier, dispatched on by handler registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageKind(pub u16);

/// A logical point-to-point message.
///
/// The body is shared so broadcast fan-out clones the handle, not the data.
#[derive(Clone)]
pub struct Message {
    kind: MessageKind,
    body: Arc<dyn Any + Send + Sync>,
}

impl Message {
    pub fn new<T: Any + Send + Sync>(kind: MessageKind, body: T) -> Self {
        Message {
            kind,
            body: Arc::new(body),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Downcast the body to its concrete type.
    ///
    /// Returns `None` if the message carries a different type, which in a
    /// correct protocol indicates a kind/body mismatch at the sender.
    pub fn body<T: Any>(&self) -> Option<&T> {
        self.body.downcast_ref()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PING: MessageKind = MessageKind(1);

    #[test]
    fn test_body_downcast() {
        let msg = Message::new(PING, 42u32);
        assert_eq!(msg.kind(), PING);
        assert_eq!(msg.body::<u32>(), Some(&42));
        assert_eq!(msg.body::<u64>(), None);
    }

    #[test]
    fn test_clone_shares_body() {
        let msg = Message::new(PING, String::from("hello"));
        let copy = msg.clone();
        assert_eq!(copy.body::<String>().map(String::as_str), Some("hello"));
    }
}
