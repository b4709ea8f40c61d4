use std::sync::{Arc, Mutex};

pub type SignalCallback = Arc<dyn Fn() + Send + Sync>;

/// A system-wide confirmation trigger (a global hotkey, a remote press, a
/// button in a host UI). At most one callback is registered at a time;
/// registering replaces any previous one.
pub trait SignalChannel: Send + Sync {
    fn register(&self, callback: SignalCallback);
    fn unregister(&self);
}

/// In-process signal channel: whatever input hook the host wires up calls
/// [`InProcessSignal::fire`], which invokes the currently registered
/// callback on the caller's thread.
#[derive(Default)]
pub struct InProcessSignal {
    slot: Mutex<Option<SignalCallback>>,
}

impl InProcessSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        // Clone out of the lock before invoking: the callback may unregister
        // itself through this same channel.
        let callback = self.slot.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl SignalChannel for InProcessSignal {
    fn register(&self, callback: SignalCallback) {
        *self.slot.lock().unwrap() = Some(callback);
    }

    fn unregister(&self) {
        *self.slot.lock().unwrap() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn register_replaces_previous_callback() {
        let signal = InProcessSignal::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first);
        signal.register(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = Arc::clone(&second);
        signal.register(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        signal.fire();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fire_after_unregister_is_a_noop() {
        let signal = InProcessSignal::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        signal.register(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        signal.unregister();
        signal.fire();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn callback_may_unregister_itself() {
        let signal = Arc::new(InProcessSignal::new());
        let channel = Arc::clone(&signal);
        signal.register(Arc::new(move || channel.unregister()));
        signal.fire();
        signal.fire(); // second press lands on an empty slot
    }
}
