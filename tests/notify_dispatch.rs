// tests/notify_dispatch.rs
//
// Dispatcher behavior with an in-process transport: validation happens before
// any delivery attempt, and transport failures surface their diagnostic text.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lettre::Message;
use mention_analytics::notify::email::{EmailRequest, MailTransport, SmtpTarget};
use mention_analytics::{NotificationDispatcher, SendError};

struct RecordingTransport {
    calls: Arc<AtomicUsize>,
    fail_with: Option<String>,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(&self, target: &SmtpTarget, message: Message) -> Result<(), String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(target.port, 465);
        assert_eq!(message.envelope().to().len(), 2);
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

fn dispatcher(fail_with: Option<&str>) -> (NotificationDispatcher, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let d = NotificationDispatcher::new(Box::new(RecordingTransport {
        calls: calls.clone(),
        fail_with: fail_with.map(str::to_string),
    }));
    (d, calls)
}

fn request() -> EmailRequest {
    EmailRequest {
        recipients: "ops@example.com , press@example.com".into(),
        sender: "x@y.com".into(),
        smtp_host: "smtp.example.com".into(),
        smtp_port: "465".into(),
        smtp_password: "app-password".into(),
        subject: "Mentions Report".into(),
        body: "Attached is the Mentions mentions report (CSV).".into(),
        attachment_name: "mentions_filtered.csv".into(),
        attachment: b"published,source,tonality,title,summary,link\n".to_vec(),
    }
}

#[tokio::test]
async fn blank_recipients_never_reach_transport() {
    let (d, calls) = dispatcher(None);
    let mut req = request();
    req.recipients = String::new();

    assert_eq!(d.send(&req).await, Err(SendError::MissingField("recipients")));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn every_required_field_is_checked() {
    let fields: [(&str, fn(&mut EmailRequest)); 5] = [
        ("recipients", |r| r.recipients = " , ".into()),
        ("sender", |r| r.sender = "  ".into()),
        ("smtp_host", |r| r.smtp_host = String::new()),
        ("smtp_port", |r| r.smtp_port = String::new()),
        ("smtp_password", |r| r.smtp_password = String::new()),
    ];
    let (d, calls) = dispatcher(None);
    for (name, blank) in fields {
        let mut req = request();
        blank(&mut req);
        assert_eq!(d.send(&req).await, Err(SendError::MissingField(name)), "field {name}");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn successful_send_uses_transport_once() {
    let (d, calls) = dispatcher(None);
    assert_eq!(d.send(&request()).await, Ok(()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transport_failure_is_reported_not_retried() {
    let (d, calls) = dispatcher(Some("535 authentication failed"));
    let err = d.send(&request()).await.unwrap_err();

    assert_eq!(err, SendError::TransportError("535 authentication failed".into()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
