// SPDX-License-Identifier: Apache-2.0

//! File lifecycle notifications.
//!
//! Listeners run synchronously on the tail thread, in registration order,
//! and delay tailing for as long as they take. Each emit works on a snapshot
//! of the registered listeners, so subscribing or unsubscribing during a
//! delivery affects only later deliveries.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::tail::error::BoxError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The tail loop opened the file for reading
    FileStarted(PathBuf),
    /// A newer file is queued and this one will not be read again
    FileCompleted(PathBuf),
}

impl LifecycleEvent {
    pub fn path(&self) -> &Path {
        match self {
            LifecycleEvent::FileStarted(path) | LifecycleEvent::FileCompleted(path) => path,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::FileStarted(path) => write!(f, "started {}", path.display()),
            LifecycleEvent::FileCompleted(path) => write!(f, "completed {}", path.display()),
        }
    }
}

pub trait LifecycleListener: Send + Sync {
    fn notify(&self, event: &LifecycleEvent) -> Result<(), BoxError>;
}

impl<F> LifecycleListener for F
where
    F: Fn(&LifecycleEvent) -> Result<(), BoxError> + Send + Sync,
{
    fn notify(&self, event: &LifecycleEvent) -> Result<(), BoxError> {
        self(event)
    }
}

/// Handle returned by [`LifecycleEventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Registered = (ListenerId, Arc<dyn LifecycleListener>);

#[derive(Default)]
pub struct LifecycleEventBus {
    listeners: Mutex<Vec<Registered>>,
    next_id: AtomicU64,
}

impl LifecycleEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl LifecycleListener + 'static) -> ListenerId {
        self.subscribe_arc(Arc::new(listener))
    }

    pub fn subscribe_arc(&self, listener: Arc<dyn LifecycleListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every listener registered at the time of the call.
    ///
    /// Stops at the first listener error and returns it.
    pub fn emit(&self, event: &LifecycleEvent) -> Result<(), BoxError> {
        let snapshot: Vec<Arc<dyn LifecycleListener>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in snapshot {
            listener.notify(event)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_emit_reaches_all_listeners() {
        let bus = LifecycleEventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let seen = seen.clone();
            bus.subscribe(move |event: &LifecycleEvent| -> Result<(), BoxError> {
                seen.lock().unwrap().push(event.clone());
                Ok(())
            });
        }

        let event = LifecycleEvent::FileStarted(PathBuf::from("/logs/a.log"));
        bus.emit(&event).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![event.clone(), event]);
    }

    #[test]
    fn test_emit_without_listeners() {
        let bus = LifecycleEventBus::new();
        assert!(bus.is_empty());
        assert!(
            bus.emit(&LifecycleEvent::FileCompleted(PathBuf::from("a")))
                .is_ok()
        );
    }

    #[test]
    fn test_unsubscribe() {
        let bus = LifecycleEventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let id = bus.subscribe(move |_: &LifecycleEvent| -> Result<(), BoxError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let event = LifecycleEvent::FileStarted(PathBuf::from("a"));
        bus.emit(&event).unwrap();
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(&event).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_during_emit_uses_snapshot() {
        let bus = Arc::new(LifecycleEventBus::new());
        let count = Arc::new(AtomicUsize::new(0));
        let second_id = Arc::new(Mutex::new(None::<ListenerId>));

        {
            let bus_ref = Arc::downgrade(&bus);
            let second_id = second_id.clone();
            bus.subscribe(move |_: &LifecycleEvent| -> Result<(), BoxError> {
                if let (Some(bus), Some(id)) = (bus_ref.upgrade(), *second_id.lock().unwrap()) {
                    bus.unsubscribe(id);
                }
                Ok(())
            });
        }
        {
            let count = count.clone();
            let id = bus.subscribe(move |_: &LifecycleEvent| -> Result<(), BoxError> {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            *second_id.lock().unwrap() = Some(id);
        }

        let event = LifecycleEvent::FileStarted(PathBuf::from("a"));
        bus.emit(&event).unwrap();
        // Removed mid-delivery, still called for the in-flight event
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.len(), 1);

        bus.emit(&event).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_error_propagates() {
        let bus = LifecycleEventBus::new();
        bus.subscribe(|_: &LifecycleEvent| -> Result<(), BoxError> { Err("boom".into()) });

        let err = bus
            .emit(&LifecycleEvent::FileStarted(PathBuf::from("a")))
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_event_display() {
        let event = LifecycleEvent::FileCompleted(PathBuf::from("/logs/a.log"));
        assert_eq!(event.to_string(), "completed /logs/a.log");
        assert_eq!(event.path(), Path::new("/logs/a.log"));
    }
}
