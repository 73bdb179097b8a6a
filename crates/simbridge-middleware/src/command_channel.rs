//! Command ingestion queue.
//!
//! Input collaborators (keyboard / joystick pollers, the CLI console) push
//! raw `<verb>_<arg>` tokens through any number of cloned [`CommandSender`]s.
//! Exactly one [`CommandReceiver`], owned by the arbitration loop, pops at
//! most one token per tick and decodes it into a typed [`Command`].
//!
//! The queue is unbounded and outlives individual control-loop runs, so
//! tokens pushed while the loop restarts are still delivered.

use simbridge_types::{BridgeError, Command};
use tokio::sync::mpsc;
use tracing::debug;

/// Create a connected sender / receiver pair.
pub fn command_channel() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandSender { tx }, CommandReceiver { rx })
}

/// Producer half. Clone it for every input collaborator.
#[derive(Clone, Debug)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<String>,
}

impl CommandSender {
    /// Queue a raw command token.
    ///
    /// Tokens are not validated here; malformed ones are dropped by the
    /// consumer.  Fails only when the receiver has been dropped.
    pub fn push(&self, raw: impl Into<String>) -> Result<(), BridgeError> {
        self.tx
            .send(raw.into())
            .map_err(|e| BridgeError::Channel(format!("command channel closed, dropped {:?}", e.0)))
    }

    /// `true` once the consuming side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, owned by the arbitration loop.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::UnboundedReceiver<String>,
}

impl CommandReceiver {
    /// Pop the oldest queued token without blocking and decode it.
    ///
    /// Returns `None` when the queue is empty, when every producer is gone,
    /// or when the popped token is malformed.  A malformed token is consumed,
    /// so a bad producer can never wedge the queue.
    pub fn try_pop(&mut self) -> Option<Command> {
        let raw = self.rx.try_recv().ok()?;
        match raw.parse::<Command>() {
            Ok(command) => Some(command),
            Err(e) => {
                debug!(error = %e, "dropping malformed command");
                None
            }
        }
    }

    /// Number of tokens waiting to be popped.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
