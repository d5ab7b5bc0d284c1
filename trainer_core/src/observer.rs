//! Observer list owned by an engine instance.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback<T> = Rc<dyn Fn(&T)>;

struct Registry<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

/// Listeners notified with a reference to the latest value
pub struct Listeners<T> {
    inner: Rc<RefCell<Registry<T>>>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }
}

impl<T> Listeners<T> {
    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Subscription<T> {
        let mut registry = self.inner.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push((id, Rc::new(listener)));
        Subscription {
            registry: Rc::downgrade(&self.inner),
            id,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notify every listener. The list is copied first so a listener may
    /// unsubscribe itself (or others) while being notified.
    pub fn emit(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for cb in callbacks {
            cb(value);
        }
    }
}

/// Handle returned by `subscribe`; call `unsubscribe` to stop notifications.
///
/// Dropping the handle keeps the listener registered.
pub struct Subscription<T> {
    registry: Weak<RefCell<Registry<T>>>,
    id: u64,
}

impl<T> Subscription<T> {
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .borrow_mut()
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}
