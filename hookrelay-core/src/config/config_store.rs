//! Versioned config snapshots with change notification.
//!
//! Readers take an `Arc<T>` snapshot and never hold a lock across an
//! `.await`. Writers replace the whole value; every replacement bumps the
//! version and wakes all watchers.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug)]
struct Snapshot<T> {
    version: u64,
    value: Arc<T>,
}

/// A shared, versioned configuration value.
#[derive(Debug)]
pub struct ConfigStore<T> {
    tx: Arc<watch::Sender<Snapshot<T>>>,
}

/// Receives notifications when a [`ConfigStore`] is updated.
#[derive(Debug)]
pub struct ConfigWatcher<T> {
    rx: watch::Receiver<Snapshot<T>>,
}

// -- ConfigStore --------------------------------------------------------

impl<T> ConfigStore<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(Snapshot {
            version: 0,
            value: Arc::new(initial),
        });
        Self { tx: Arc::new(tx) }
    }

    /// The current value.
    pub fn current(&self) -> Arc<T> {
        Arc::clone(&self.tx.borrow().value)
    }

    /// Number of updates applied so far.
    pub fn version(&self) -> u64 {
        self.tx.borrow().version
    }

    /// Replace the stored value and notify all watchers.
    pub fn update(&self, value: T) {
        self.tx.send_modify(|snapshot| {
            snapshot.version += 1;
            snapshot.value = Arc::new(value);
        });
    }

    pub fn subscribe(&self) -> ConfigWatcher<T> {
        ConfigWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T> Clone for ConfigStore<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

// -- ConfigWatcher ------------------------------------------------------

impl<T> ConfigWatcher<T> {
    /// Wait for the next update and return the new value.
    ///
    /// Returns `Err` once every [`ConfigStore`] handle has been dropped.
    pub async fn changed(&mut self) -> Result<Arc<T>, watch::error::RecvError> {
        self.rx.changed().await?;
        Ok(Arc::clone(&self.rx.borrow_and_update().value))
    }
}
