//! change/touch listener registry

use std::fmt;

/// zero-argument notification callback
pub type Callback = Box<dyn FnMut()>;

/// handle returned on registration, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// touched and change subscribers
///
/// `notify` is one burst: every touched listener, then every change listener,
/// each exactly once
#[derive(Default)]
pub struct Listeners {
    next_id: u64,
    touched: Vec<(ListenerId, Callback)>,
    changed: Vec<(ListenerId, Callback)>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_touched(&mut self, callback: impl FnMut() + 'static) -> ListenerId {
        let id = self.next_id();
        self.touched.push((id, Box::new(callback)));
        id
    }

    pub fn on_change(&mut self, callback: impl FnMut() + 'static) -> ListenerId {
        let id = self.next_id();
        self.changed.push((id, Box::new(callback)));
        id
    }

    /// remove a listener; returns false when the id is not registered
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.touched.len() + self.changed.len();
        self.touched.retain(|(l, _)| *l != id);
        self.changed.retain(|(l, _)| *l != id);
        before != self.touched.len() + self.changed.len()
    }

    pub fn notify(&mut self) {
        for (_, callback) in self.touched.iter_mut() {
            callback();
        }
        for (_, callback) in self.changed.iter_mut() {
            callback();
        }
    }

    pub fn len(&self) -> usize {
        self.touched.len() + self.changed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_id(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("touched", &self.touched.len())
            .field("changed", &self.changed.len())
            .finish()
    }
}
