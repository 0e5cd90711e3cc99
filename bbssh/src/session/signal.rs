//! One-shot signal between the session handler and the connection driver.
//!
//! The handler side lives inside the russh session task and fires at most
//! once; the driver side waits for it with an explicit timeout.

use std::time::Duration;

use tokio::sync::oneshot;

/// Create a linked notifier/waiter pair.
pub fn signal<T>() -> (Notifier<T>, Waiter<T>) {
    let (tx, rx) = oneshot::channel();
    (Notifier { tx: Some(tx) }, Waiter { rx })
}

/// Sending half. Only the first [`notify`](Self::notify) is delivered.
#[derive(Debug)]
pub struct Notifier<T> {
    tx: Option<oneshot::Sender<T>>,
}

impl<T> Notifier<T> {
    /// Deliver `value` if nothing was delivered yet.
    ///
    /// Returns `true` when this call delivered the value. Later calls, or a
    /// waiter that already gave up, return `false` and drop `value`.
    pub fn notify(&mut self, value: T) -> bool {
        match self.tx.take() {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    /// Whether the signal has already been used.
    pub fn is_spent(&self) -> bool {
        self.tx.is_none()
    }
}

/// Receiving half.
#[derive(Debug)]
pub struct Waiter<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Waiter<T> {
    /// Wait up to `timeout` for the value.
    ///
    /// Returns `None` on timeout, or straight away if the notifier was
    /// dropped without firing (the session ended).
    pub async fn wait(self, timeout: Duration) -> Option<T> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(_)) | Err(_) => None,
        }
    }
}
