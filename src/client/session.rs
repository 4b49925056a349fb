//! Chat session state and the send/complete cycle.
//!
//! `send_message` does the synchronous part of a submission and spawns one
//! task for the network call. The task owns its request and result and hands
//! a [`Reply`] back through [`Replies`]; `complete` applies it on the UI side.

use crate::client::http::ChatBackend;
use crate::config::UiConfig;
use crate::error::ChatError;
use crate::protocol::{render_reply, ChatRequest};
use crate::transcript::{create_message_element, Role, Transcript};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use tui_input::Input;

/// Result of one submission's network call.
#[derive(Debug)]
pub struct Reply {
    /// The text that was submitted.
    pub request: ChatRequest,
    pub result: Result<Value, ChatError>,
}

/// Receiving end for settled submissions.
pub struct Replies {
    rx: mpsc::UnboundedReceiver<Reply>,
}

impl Replies {
    /// Wait for the next submission to settle, in arrival order.
    pub async fn recv(&mut self) -> Option<Reply> {
        self.rx.recv().await
    }
}

/// Scroll position of the transcript pane, in wrapped lines from the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscriptView {
    pub offset: u16,
    /// Stick to the newest entry on every redraw.
    pub follow: bool,
}

impl Default for TranscriptView {
    fn default() -> Self {
        Self {
            offset: 0,
            follow: true,
        }
    }
}

impl TranscriptView {
    pub fn scroll_up(&mut self, lines: u16) {
        self.follow = false;
        self.offset = self.offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.follow = false;
        self.offset = self.offset.saturating_add(lines);
    }

    pub fn scroll_to_latest(&mut self) {
        self.follow = true;
    }

    /// Clamp against the content height and resolve following.
    pub fn resolve(&mut self, content_lines: u16, visible_lines: u16) -> u16 {
        let max = content_lines.saturating_sub(visible_lines);
        if self.follow || self.offset >= max {
            self.offset = max;
            self.follow = true;
        }
        self.offset
    }
}

/// Everything the chat screen shows, plus the backend it talks to.
pub struct ChatSession<B: ChatBackend + 'static> {
    backend: Arc<B>,
    markers: UiConfig,
    input: Input,
    transcript: Transcript,
    status: String,
    view: TranscriptView,
    tx: mpsc::UnboundedSender<Reply>,
}

impl<B: ChatBackend + 'static> ChatSession<B> {
    /// Create a session and the channel its replies arrive on.
    pub fn new(backend: B, markers: UiConfig) -> (Self, Replies) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            backend: Arc::new(backend),
            status: markers.idle_marker.clone(),
            markers,
            input: Input::default(),
            transcript: Transcript::new(),
            view: TranscriptView::default(),
            tx,
        };
        (session, Replies { rx })
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut Input {
        &mut self.input
    }

    pub fn set_input(&mut self, value: impl Into<String>) {
        self.input = Input::new(value.into());
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn view(&self) -> &TranscriptView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut TranscriptView {
        &mut self.view
    }

    pub fn title(&self) -> &str {
        &self.markers.title
    }

    /// Submit the current input.
    ///
    /// The input is cleared and the user message is on the transcript
    /// before the request task exists. Empty input is sent as-is.
    pub fn send_message(&mut self) -> JoinHandle<()> {
        let text = self.input.value().to_string();
        self.input.reset();

        self.transcript
            .append(create_message_element(&text, Role::User));
        self.status = self.markers.processing_marker.clone();

        let request = ChatRequest::new(text);
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = backend.send(&request).await;
            // The receiver is gone only when the session is shutting down.
            let _ = tx.send(Reply { request, result });
        })
    }

    /// Apply a settled submission.
    pub fn complete(&mut self, reply: Reply) {
        match reply.result {
            Ok(body) => {
                debug!("Reply received for {:?}", reply.request.user);
                self.transcript
                    .append(create_message_element(render_reply(&body), Role::Bot));
            }
            Err(e) => {
                error!("Error: {}", e);
            }
        }
        self.status = self.markers.idle_marker.clone();
        self.view.scroll_to_latest();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// Backend whose answers are handed out by the test, one per request text.
    #[derive(Default)]
    pub(crate) struct ScriptedBackend {
        pub sent: Mutex<Vec<ChatRequest>>,
        gates: Mutex<HashMap<String, oneshot::Receiver<Result<Value, ChatError>>>>,
    }

    impl ScriptedBackend {
        /// Register an answer for `user`; it is returned once the sender fires.
        pub fn gate(&self, user: &str) -> oneshot::Sender<Result<Value, ChatError>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(user.to_string(), rx);
            tx
        }
    }

    #[async_trait::async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn send(&self, request: &ChatRequest) -> Result<Value, ChatError> {
            self.sent.lock().unwrap().push(request.clone());
            let gate = self.gates.lock().unwrap().remove(&request.user);
            match gate {
                Some(rx) => rx.await.expect("gate dropped"),
                None => Ok(json!({ "echo": request.user })),
            }
        }
    }

    /// Log sink shared with a scoped subscriber.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn decode_error() -> ChatError {
        serde_json::from_str::<Value>("not json").unwrap_err().into()
    }

    fn session() -> (ChatSession<ScriptedBackend>, Replies) {
        ChatSession::new(ScriptedBackend::default(), UiConfig::default())
    }

    #[tokio::test]
    async fn test_user_message_precedes_request() {
        let (mut session, mut replies) = session();
        let gate = session.backend.gate("hello");

        session.set_input("hello");
        let handle = session.send_message();

        assert_eq!(session.transcript().texts(Role::User), vec!["hello"]);
        assert_eq!(session.transcript().count(Role::Bot), 0);
        assert_eq!(session.status(), "Processing...");
        assert_eq!(session.input().value(), "");

        gate.send(Ok(json!({ "reply": "hi" }))).unwrap();
        let reply = replies.recv().await.unwrap();
        session.complete(reply);
        handle.await.unwrap();

        assert_eq!(session.transcript().count(Role::Bot), 1);
    }

    #[tokio::test]
    async fn test_successful_reply_appends_rendered_body() {
        let (mut session, mut replies) = session();
        let gate = session.backend.gate("rain?");
        gate.send(Ok(json!({ "reply": "hi" }))).unwrap();

        session.set_input("rain?");
        session.send_message();
        session.complete(replies.recv().await.unwrap());

        assert_eq!(session.transcript().texts(Role::Bot), vec![r#"{"reply":"hi"}"#]);
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.status(), ".");
        assert_eq!(session.input().value(), "");
        assert!(session.view().follow);
    }

    #[tokio::test]
    async fn test_request_body_preserves_whitespace() {
        let (mut session, mut replies) = session();
        session.set_input("  spaced out\t");
        session.send_message();
        session.complete(replies.recv().await.unwrap());

        let sent = session.backend.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), [ChatRequest::new("  spaced out\t")]);
    }

    #[tokio::test]
    async fn test_empty_input_is_sent() {
        let (mut session, mut replies) = session();
        session.send_message();

        assert_eq!(session.transcript().texts(Role::User), vec![""]);
        session.complete(replies.recv().await.unwrap());

        assert_eq!(session.backend.sent.lock().unwrap().len(), 1);
        assert_eq!(session.transcript().count(Role::Bot), 1);
    }

    #[tokio::test]
    async fn test_failure_appends_no_bot_message() {
        let (mut session, mut replies) = session();
        let gate = session.backend.gate("hello");
        gate.send(Err(decode_error())).unwrap();

        session.set_input("hello");
        session.send_message();
        let reply = replies.recv().await.unwrap();
        assert!(reply.result.is_err());
        session.complete(reply);

        assert_eq!(session.transcript().count(Role::Bot), 0);
        assert_eq!(session.transcript().count(Role::User), 1);
        assert_eq!(session.status(), ".");
        assert_eq!(session.input().value(), "");
    }

    #[tokio::test]
    async fn test_failure_is_logged_for_the_operator() {
        let (mut session, mut replies) = session();
        let gate = session.backend.gate("hello");
        gate.send(Err(decode_error())).unwrap();

        session.set_input("hello");
        session.send_message();
        let reply = replies.recv().await.unwrap();

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || session.complete(reply));

        let output = logs.contents();
        assert!(output.contains("ERROR"), "log was: {output}");
        assert!(output.contains("malformed response"), "log was: {output}");
        assert_eq!(session.transcript().count(Role::Bot), 0);
    }

    #[tokio::test]
    async fn test_overlapping_submissions_race() {
        let (mut session, mut replies) = session();
        let first = session.backend.gate("first");
        let second = session.backend.gate("second");

        session.set_input("first");
        session.send_message();
        session.set_input("second");
        session.send_message();

        assert_eq!(session.transcript().texts(Role::User), vec!["first", "second"]);

        // The later submission settles first.
        second.send(Ok(json!("answer two"))).unwrap();
        session.complete(replies.recv().await.unwrap());
        // Status resets as soon as any request settles.
        assert_eq!(session.status(), ".");

        first.send(Ok(json!("answer one"))).unwrap();
        session.complete(replies.recv().await.unwrap());

        assert_eq!(
            session.transcript().texts(Role::Bot),
            vec!["answer two", "answer one"]
        );
        assert_eq!(session.transcript().count(Role::User), 2);
        assert_eq!(session.backend.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_completion_scrolls_to_latest() {
        let (mut session, mut replies) = session();
        session.view_mut().scroll_up(5);
        assert!(!session.view().follow);

        session.set_input("hi");
        session.send_message();
        session.complete(replies.recv().await.unwrap());

        assert!(session.view().follow);
    }

    #[test]
    fn test_view_resolve_clamps() {
        let mut view = TranscriptView::default();
        assert_eq!(view.resolve(30, 10), 20);

        view.scroll_up(5);
        assert_eq!(view.resolve(30, 10), 15);
        assert!(!view.follow);

        view.scroll_down(100);
        assert_eq!(view.resolve(30, 10), 20);
        assert!(view.follow);

        // Content shorter than the pane
        let mut view = TranscriptView::default();
        assert_eq!(view.resolve(3, 10), 0);
    }
}
