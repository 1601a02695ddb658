//! Event listeners on live nodes.

use std::fmt;
use std::rc::Rc;

use super::DomId;

/// A dispatched event.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    /// Node the event was dispatched on.
    pub target: DomId,
    /// Node whose listener is currently running (changes while bubbling).
    pub current_target: DomId,
}

/// Listener callback.
pub type ListenerFn = Rc<dyn Fn(&Event)>;

/// Handle returned by [`Document::add_listener`](super::Document::add_listener).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub(crate) struct Listener {
    pub id: ListenerId,
    pub name: String,
    pub callback: ListenerFn,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
