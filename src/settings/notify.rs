//! Change-notification fan-out

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::schema::{Field, SettingValue};

/// Subscriber signature. Errors are logged and otherwise ignored.
pub type ChangeCallback = dyn Fn(Field, &SettingValue) -> anyhow::Result<()> + Send + Sync;

/// Token returned by `on_change`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Ordered list of subscribers
pub(crate) struct Subscribers {
    next_id: AtomicU64,
    entries: Mutex<Vec<(SubscriptionId, Arc<ChangeCallback>)>>,
}

impl Subscribers {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Field, &SettingValue) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        id
    }

    /// Returns false if `id` was not subscribed
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Invoke every subscriber in subscription order.
    ///
    /// The list is copied first so callbacks may (un)subscribe re-entrantly.
    /// A failing or panicking callback does not stop the ones after it.
    pub(crate) fn notify(&self, field: Field, value: &SettingValue) {
        let callbacks: Vec<Arc<ChangeCallback>> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(field, value))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!("Settings change callback failed for {}: {:#}", field, e);
                }
                Err(payload) => {
                    tracing::error!(
                        "Settings change callback panicked for {}: {}",
                        field,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> SettingValue {
        SettingValue::Text(s.to_string())
    }

    #[test]
    fn test_notify_in_subscription_order() {
        let subscribers = Subscribers::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            subscribers.subscribe(move |field, _value| {
                log.lock().unwrap().push((tag, field));
                Ok(())
            });
        }

        subscribers.notify(Field::Language, &text("en"));
        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                ("first", Field::Language),
                ("second", Field::Language),
                ("third", Field::Language),
            ]
        );
    }

    #[test]
    fn test_failures_are_isolated() {
        let subscribers = Subscribers::new();
        let reached = Arc::new(Mutex::new(Vec::new()));

        subscribers.subscribe(|_, _| anyhow::bail!("boom"));
        subscribers.subscribe(|_, _| panic!("subscriber bug"));
        let sink = Arc::clone(&reached);
        subscribers.subscribe(move |field, value| {
            sink.lock().unwrap().push((field, value.clone()));
            Ok(())
        });

        subscribers.notify(Field::Language, &text("en"));
        assert_eq!(*reached.lock().unwrap(), vec![(Field::Language, text("en"))]);
    }

    #[test]
    fn test_unsubscribe() {
        let subscribers = Subscribers::new();
        let id = subscribers.subscribe(|_, _| Ok(()));
        assert_eq!(subscribers.len(), 1);
        assert!(subscribers.unsubscribe(id));
        assert!(!subscribers.unsubscribe(id));
        assert_eq!(subscribers.len(), 0);
    }
}
