//! Last-value cells.
//!
//! A [`LatestWriter`] replaces the stored value; any number of
//! [`LatestReader`]s take whole-value snapshots of it.  Readers never observe
//! a half-written value and never block the writer, which is all the
//! single-writer / many-reader telemetry path needs.
//!
//! Built on [`tokio::sync::watch`].

use simbridge_types::BridgeError;
use tokio::sync::watch;

/// Create a cell seeded with `initial`.
pub fn latest<T>(initial: T) -> (LatestWriter<T>, LatestReader<T>) {
    let (tx, rx) = watch::channel(initial);
    (LatestWriter { tx }, LatestReader { rx })
}

/// The single writing side of a cell.
#[derive(Debug)]
pub struct LatestWriter<T> {
    tx: watch::Sender<T>,
}

impl<T> LatestWriter<T> {
    /// Replace the stored value, whether or not anybody is reading.
    pub fn publish(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Mutate the stored value in place.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }

    /// A new reader attached to this cell.
    pub fn reader(&self) -> LatestReader<T> {
        LatestReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// A reading side of a cell. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LatestReader<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> LatestReader<T> {
    /// Copy of the most recently published value.
    ///
    /// Still returns the last value after the writer is gone.
    pub fn snapshot(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Copy of the most recently published value, failing with
    /// [`BridgeError::FeedbackUnavailable`] once the writer has been dropped.
    pub fn live(&self) -> Result<T, BridgeError> {
        if self.is_live() {
            Ok(self.snapshot())
        } else {
            Err(BridgeError::FeedbackUnavailable(
                "upstream writer dropped".to_string(),
            ))
        }
    }
}

impl<T> LatestReader<T> {
    /// `true` while the writing side still exists.
    pub fn is_live(&self) -> bool {
        self.rx.has_changed().is_ok()
    }
}
