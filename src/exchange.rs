//! One submit → network call → append-or-notify cycle

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::ChatTransport;
use crate::conversation::ConversationStore;
use crate::events::ConversationRole;

pub const NETWORK_ERROR_TITLE: &str = "Network error";
pub const NETWORK_ERROR_TEXT: &str = "Check your internet connection";
pub const SERVER_ERROR_TITLE: &str = "Error";

/// Failure of a single exchange
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// Endpoint answered, but not with a usable reply
    #[error("server error (status {status:?}): {message}")]
    Server { status: Option<u16>, message: String },

    /// The request never completed
    #[error("network error: {0}")]
    Network(String),
}

/// Outcome delivered back to the UI loop by a dispatched exchange
pub type ExchangeResult = Result<String, ExchangeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Error,
    Info,
}

/// User-visible, transient notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind: NotificationKind::Info,
        }
    }
}

impl From<&ExchangeError> for Notification {
    fn from(error: &ExchangeError) -> Self {
        match error {
            ExchangeError::Server { message, .. } => Notification {
                title: SERVER_ERROR_TITLE.to_string(),
                description: message.clone(),
                kind: NotificationKind::Error,
            },
            ExchangeError::Network(_) => Notification {
                title: NETWORK_ERROR_TITLE.to_string(),
                description: NETWORK_ERROR_TEXT.to_string(),
                kind: NotificationKind::Error,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    Pending,
}

/// Result of one `submit` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Replied,
    Failed(Notification),
    Rejected(RejectReason),
}

/// Owns the conversation and the pending flag; the only writer of both
pub struct ExchangeCoordinator {
    store: ConversationStore,
    transport: Arc<dyn ChatTransport>,
    pending: bool,
}

impl ExchangeCoordinator {
    pub fn new(store: ConversationStore, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            store,
            transport,
            pending: false,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Accept a submission: append the user message and mark the exchange in flight.
    /// Returns the text to send, or why it was refused.
    pub fn begin(&mut self, text: &str) -> Result<String, RejectReason> {
        if text.trim().is_empty() {
            return Err(RejectReason::Empty);
        }
        if self.pending {
            debug!("submission refused, exchange already in flight");
            return Err(RejectReason::Pending);
        }

        let appended = self.store.append(ConversationRole::User, text);
        debug!(id = appended.id(), "user message appended");
        self.pending = true;
        Ok(text.to_string())
    }

    /// Apply the outcome of the in-flight exchange and release the pending flag
    pub fn finish(&mut self, result: ExchangeResult) -> Option<Notification> {
        self.pending = false;

        match result {
            Ok(reply) => {
                let chars = reply.chars().count();
                let appended = self.store.append(ConversationRole::Assistant, reply);
                info!(id = appended.id(), chars, "reply received");
                None
            }
            Err(error) => {
                warn!(%error, "exchange failed");
                Some(Notification::from(&error))
            }
        }
    }

    /// Run a complete exchange on the current task
    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        let message = match self.begin(text) {
            Ok(message) => message,
            Err(reason) => return SubmitOutcome::Rejected(reason),
        };

        let result = self.transport.send(&message).await;
        match self.finish(result) {
            None => SubmitOutcome::Replied,
            Some(notification) => SubmitOutcome::Failed(notification),
        }
    }

    /// Accept a submission and run its network call on a spawned task.
    /// The result arrives on `tx` and must be handed to [`finish`](Self::finish).
    pub fn dispatch<T>(
        &mut self,
        text: &str,
        tx: mpsc::UnboundedSender<T>,
    ) -> Result<(), RejectReason>
    where
        T: From<ExchangeResult> + Send + 'static,
    {
        let message = self.begin(text)?;
        let transport = Arc::clone(&self.transport);

        tokio::spawn(async move {
            let result = transport.send(&message).await;
            if tx.send(T::from(result)).is_err() {
                debug!("exchange finished after the UI loop closed");
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// Scripted transport that records what it was sent
    struct FakeTransport {
        result: ExchangeResult,
        sent: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        fn new(result: ExchangeResult) -> Arc<Self> {
            Arc::new(Self {
                result,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatTransport for FakeTransport {
        async fn send(&self, message: &str) -> ExchangeResult {
            self.sent.lock().unwrap().push(message.to_string());
            self.result.clone()
        }
    }

    fn coordinator(transport: Arc<dyn ChatTransport>) -> ExchangeCoordinator {
        ExchangeCoordinator::new(ConversationStore::new("greeting"), transport)
    }

    #[tokio::test]
    async fn test_success_appends_user_then_assistant() {
        let transport = FakeTransport::new(Ok("hi".to_string()));
        let mut coord = coordinator(transport.clone());

        let outcome = coord.submit("hello").await;

        assert_eq!(outcome, SubmitOutcome::Replied);
        let msgs = coord.store().all();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[1].text(), "hello");
        assert!(msgs[1].is_user());
        assert_eq!(msgs[2].text(), "hi");
        assert_eq!(msgs[2].role(), ConversationRole::Assistant);
        assert!(!coord.is_pending());
        assert_eq!(*transport.sent.lock().unwrap(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_server_error_notifies_without_reply() {
        let transport = FakeTransport::new(Err(ExchangeError::Server {
            status: Some(400),
            message: "bad input".to_string(),
        }));
        let mut coord = coordinator(transport);

        let outcome = coord.submit("hello").await;

        match outcome {
            SubmitOutcome::Failed(n) => {
                assert_eq!(n.description, "bad input");
                assert_eq!(n.title, SERVER_ERROR_TITLE);
                assert_eq!(n.kind, NotificationKind::Error);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(coord.store().len(), 2);
        assert!(coord.store().last().unwrap().is_user());
        assert!(!coord.is_pending());
    }

    #[tokio::test]
    async fn test_network_error_notifies_generic() {
        let transport =
            FakeTransport::new(Err(ExchangeError::Network("connection refused".into())));
        let mut coord = coordinator(transport);

        let outcome = coord.submit("hello").await;

        let SubmitOutcome::Failed(n) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(n.title, NETWORK_ERROR_TITLE);
        assert_eq!(n.description, NETWORK_ERROR_TEXT);
        assert_eq!(coord.store().len(), 2);
        assert!(!coord.is_pending());
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected() {
        let transport = FakeTransport::new(Ok("unused".to_string()));
        let mut coord = coordinator(transport.clone());

        for input in ["", "   ", "\n\t "] {
            assert_eq!(coord.submit(input).await, SubmitOutcome::Rejected(RejectReason::Empty));
        }
        assert_eq!(coord.store().len(), 1);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_begin_refuses_while_pending() {
        let mut coord = coordinator(FakeTransport::new(Ok("x".to_string())));

        assert_eq!(coord.begin("one"), Ok("one".to_string()));
        assert!(coord.is_pending());
        assert_eq!(coord.begin("two"), Err(RejectReason::Pending));
        assert_eq!(coord.begin("three"), Err(RejectReason::Pending));
        assert_eq!(coord.store().len(), 2);

        assert_eq!(coord.finish(Ok("reply".to_string())), None);
        assert!(!coord.is_pending());
        assert_eq!(coord.begin("four"), Ok("four".to_string()));
    }

    /// Transport that reports how many messages were in the store when the
    /// call started, then waits for the test to release it.
    struct GatedTransport {
        started: Mutex<Option<oneshot::Sender<()>>>,
        release: Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait]
    impl ChatTransport for GatedTransport {
        async fn send(&self, _message: &str) -> ExchangeResult {
            if let Some(started) = self.started.lock().unwrap().take() {
                let _ = started.send(());
            }
            let release = self.release.lock().unwrap().take();
            if let Some(release) = release {
                let _ = release.await;
            }
            Ok("done".to_string())
        }
    }

    #[tokio::test]
    async fn test_dispatch_appends_before_network_resolves() {
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        let transport = Arc::new(GatedTransport {
            started: Mutex::new(Some(started_tx)),
            release: Mutex::new(Some(release_rx)),
        });
        let mut coord = coordinator(transport);
        let (tx, mut rx) = mpsc::unbounded_channel::<ExchangeResult>();

        coord.dispatch("hello", tx.clone()).unwrap();
        started_rx.await.unwrap();

        // in flight: user message already visible, further submissions refused
        assert_eq!(coord.store().len(), 2);
        assert!(coord.store().last().unwrap().is_user());
        assert!(coord.is_pending());
        assert_eq!(coord.dispatch("again", tx), Err(RejectReason::Pending));
        assert_eq!(coord.store().len(), 2);

        release_tx.send(()).unwrap();
        let result = rx.recv().await.unwrap();
        assert_eq!(coord.finish(result), None);

        assert_eq!(coord.store().len(), 3);
        assert_eq!(coord.store().last().unwrap().text(), "done");
        assert!(!coord.is_pending());
    }

    #[test]
    fn test_notification_from_errors() {
        let n = Notification::from(&ExchangeError::Network("timeout".into()));
        assert_eq!(n.description, NETWORK_ERROR_TEXT);

        let n = Notification::from(&ExchangeError::Server {
            status: None,
            message: "quota exceeded".into(),
        });
        assert_eq!(n.title, "Error");
        assert_eq!(n.description, "quota exceeded");
    }
}
