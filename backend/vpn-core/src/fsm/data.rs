use crate::error::{CoreError, ErrorKind};
use crate::oauth::CancelHandle;

use models::{ConnectionProfile, Profile};

use std::fmt::{Debug, Formatter, Result as FormatResult};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

/// Payload handed to the state callback, one variant per transition site.
#[derive(Debug, Clone)]
pub enum StateData {
    None,
    OAuthStarted {
        url: String,
        port: u16,
        cancel: CancelHandle,
    },
    AskLocation {
        locations: Vec<String>,
        reply: Reply<String>,
    },
    AskProfile {
        profiles: Vec<Profile>,
        reply: Reply<String>,
    },
    GotConfig(ConnectionProfile),
    Error(ErrorSummary),
}

/// Kind and bare message of the error that forced a transition back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSummary {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&CoreError> for ErrorSummary {
    fn from(error: &CoreError) -> Self {
        ErrorSummary {
            kind: error.kind(),
            message: error.message(),
        }
    }
}

/// One-shot answer slot for a pending AskProfile / AskLocation.
///
/// Clones share the slot; the first `send` wins. Usable from the synchronous
/// state callback.
pub struct Reply<T> {
    slot: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Reply<T> {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<T>) {
        let (sender, receiver) = oneshot::channel();
        let reply = Reply {
            slot: Arc::new(Mutex::new(Some(sender))),
        };
        (reply, receiver)
    }

    /// Returns `false` if the slot was already used or the waiter is gone.
    pub fn send(&self, value: T) -> bool {
        match self.take() {
            Some(sender) => sender.send(value).is_ok(),
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|sender| !sender.is_closed()))
            .unwrap_or(false)
    }

    /// Drops the sender so the waiter observes a cancellation.
    pub(crate) fn cancel(&self) -> bool {
        self.take().is_some()
    }

    fn take(&self) -> Option<oneshot::Sender<T>> {
        self.slot.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl<T> Clone for Reply<T> {
    fn clone(&self) -> Self {
        Reply {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Debug for Reply<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.debug_struct("Reply")
            .field("pending", &self.is_pending())
            .finish()
    }
}
