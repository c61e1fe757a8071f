use std::fmt;

use fgms::{AdminSnapshot, BlacklistSelector, BlacklistView};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

pub const ADMIN_QUEUE: usize = 64;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("relay is not running")]
    Closed,
}

/// Requests served by the task that owns the engine.
pub enum AdminRequest {
    Snapshot {
        reply: oneshot::Sender<AdminSnapshot>,
    },
    DeleteBlacklist {
        selector: BlacklistSelector,
        reply: oneshot::Sender<Option<BlacklistView>>,
    },
    Say {
        target: u32,
        text: String,
    },
    Shutdown,
}

impl fmt::Debug for AdminRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminRequest::Snapshot { .. } => write!(f, "Snapshot"),
            AdminRequest::DeleteBlacklist { selector, .. } => {
                write!(f, "DeleteBlacklist({})", selector)
            }
            AdminRequest::Say { target, text } => write!(f, "Say({}, {:?})", target, text),
            AdminRequest::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Cloneable front end for [`AdminRequest`]s. The `blocking_*` variants are
/// for callers outside the runtime, such as the dashboard thread.
#[derive(Debug, Clone)]
pub struct AdminHandle {
    tx: mpsc::Sender<AdminRequest>,
}

impl AdminHandle {
    pub fn channel() -> (Self, mpsc::Receiver<AdminRequest>) {
        let (tx, rx) = mpsc::channel(ADMIN_QUEUE);
        (Self { tx }, rx)
    }

    pub async fn snapshot(&self) -> Result<AdminSnapshot, AdminError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AdminRequest::Snapshot { reply })
            .await
            .map_err(|_| AdminError::Closed)?;
        rx.await.map_err(|_| AdminError::Closed)
    }

    pub fn blocking_snapshot(&self) -> Result<AdminSnapshot, AdminError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .blocking_send(AdminRequest::Snapshot { reply })
            .map_err(|_| AdminError::Closed)?;
        rx.blocking_recv().map_err(|_| AdminError::Closed)
    }

    #[cfg(test)]
    pub async fn delete_blacklist(
        &self,
        selector: BlacklistSelector,
    ) -> Result<Option<BlacklistView>, AdminError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AdminRequest::DeleteBlacklist { selector, reply })
            .await
            .map_err(|_| AdminError::Closed)?;
        rx.await.map_err(|_| AdminError::Closed)
    }

    pub fn blocking_delete_blacklist(
        &self,
        selector: BlacklistSelector,
    ) -> Result<Option<BlacklistView>, AdminError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .blocking_send(AdminRequest::DeleteBlacklist { selector, reply })
            .map_err(|_| AdminError::Closed)?;
        rx.blocking_recv().map_err(|_| AdminError::Closed)
    }

    pub fn say(&self, target: u32, text: impl Into<String>) -> Result<(), AdminError> {
        self.tx
            .try_send(AdminRequest::Say {
                target,
                text: text.into(),
            })
            .map_err(|_| AdminError::Closed)
    }

    pub fn shutdown(&self) {
        let _ = self.tx.try_send(AdminRequest::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_closed_channel() {
        let (handle, rx) = AdminHandle::channel();
        drop(rx);
        assert!(matches!(handle.snapshot().await, Err(AdminError::Closed)));
    }

    #[tokio::test]
    async fn test_say_queues_request() {
        let (handle, mut rx) = AdminHandle::channel();
        handle.say(0, "maintenance in 5 minutes").unwrap();
        match rx.recv().await {
            Some(AdminRequest::Say { target, text }) => {
                assert_eq!(target, 0);
                assert_eq!(text, "maintenance in 5 minutes");
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }
}
