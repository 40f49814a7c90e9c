//! Ordered listener sets for matched frames.

use std::fmt;

use crate::spec::Frame;

/// Receives frames matched by a [`FrameSpec`](crate::FrameSpec).
///
/// Implemented for every `FnMut(&Frame)` closure.
pub trait FrameListener {
    fn on_frame_matched(&mut self, frame: &Frame);
}

impl<F> FrameListener for F
where
    F: FnMut(&Frame),
{
    fn on_frame_matched(&mut self, frame: &Frame) {
        self(frame)
    }
}

/// Handle returned by [`Listeners::add`], used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listeners invoked in the order they were added.
#[derive(Default)]
pub struct Listeners {
    entries: Vec<(ListenerId, Box<dyn FrameListener>)>,
    next_id: u64,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener. Each call yields a distinct handle, so the same
    /// closure type may be registered more than once.
    pub fn add<L: FrameListener + 'static>(&mut self, listener: L) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if the handle is unknown or already removed.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        match self.entries.iter().position(|(entry, _)| *entry == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries.iter().any(|(entry, _)| *entry == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn dispatch(&mut self, frame: &Frame) {
        for (_, listener) in &mut self.entries {
            listener.on_frame_matched(frame);
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.entries.len())
            .finish()
    }
}
