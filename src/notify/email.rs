use async_trait::async_trait;
use lettre::message::{header::ContentType, Attachment, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};
use metrics::counter;

use crate::ingest::ensure_metrics_described;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("mail transport failed: {0}")]
    TransportError(String),
}

/// Everything needed to share one report by email, as entered by the analyst.
#[derive(Debug, Clone, Default)]
pub struct EmailRequest {
    /// Comma-separated addresses.
    pub recipients: String,
    pub sender: String,
    pub smtp_host: String,
    pub smtp_port: String,
    pub smtp_password: String,
    pub subject: String,
    pub body: String,
    pub attachment_name: String,
    pub attachment: Vec<u8>,
}

/// SMTP coordinates after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// Delivers one built message in a single authenticated session.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, target: &SmtpTarget, message: Message) -> Result<(), String>;
}

/// Implicit-TLS SMTP (SMTPS) via lettre; one connection per message.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpsTransport;

#[async_trait]
impl MailTransport for SmtpsTransport {
    async fn deliver(&self, target: &SmtpTarget, message: Message) -> Result<(), String> {
        let creds = Credentials::new(target.username.clone(), target.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&target.host)
            .map_err(|e| e.to_string())?
            .port(target.port)
            .credentials(creds)
            .build();

        mailer.send(message).await.map_err(|e| e.to_string())?;
        Ok(())
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, SendError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(SendError::MissingField(field));
    }
    Ok(v)
}

fn mailbox(value: &str, field: &'static str) -> Result<Mailbox, SendError> {
    value.parse::<Mailbox>().map_err(|e| SendError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

/// Split a comma-separated recipient list; any blank entry is a missing recipient.
pub fn split_recipients(raw: &str) -> Result<Vec<String>, SendError> {
    required(raw, "recipients")?;
    raw.split(',')
        .map(|r| required(r, "recipients").map(str::to_string))
        .collect()
}

/// Validated, ready-to-send parts of a request. Produced without any network activity.
#[derive(Debug)]
pub struct PreparedEmail {
    pub target: SmtpTarget,
    pub recipients: Vec<String>,
    pub message: Message,
}

pub fn prepare(req: &EmailRequest) -> Result<PreparedEmail, SendError> {
    let recipients = split_recipients(&req.recipients)?;
    let sender = required(&req.sender, "sender")?;
    let host = required(&req.smtp_host, "smtp_host")?;
    let port_raw = required(&req.smtp_port, "smtp_port")?;
    // Checked for blankness only; the password itself is passed through untrimmed.
    required(&req.smtp_password, "smtp_password")?;

    let port = match port_raw.parse::<u16>() {
        Ok(p) if p > 0 => p,
        _ => {
            return Err(SendError::InvalidField {
                field: "smtp_port",
                reason: format!("`{port_raw}` is not a TCP port"),
            })
        }
    };

    let mut builder = Message::builder()
        .from(mailbox(sender, "sender")?)
        .subject(req.subject.clone());
    for r in &recipients {
        builder = builder.to(mailbox(r, "recipients")?);
    }

    let csv_type = ContentType::parse("text/csv").map_err(|e| SendError::InvalidField {
        field: "attachment",
        reason: e.to_string(),
    })?;
    let message = builder
        .multipart(
            MultiPart::mixed()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(req.body.clone()),
                )
                .singlepart(
                    Attachment::new(req.attachment_name.clone()).body(req.attachment.clone(), csv_type),
                ),
        )
        .map_err(|e| SendError::InvalidField {
            field: "message",
            reason: e.to_string(),
        })?;

    Ok(PreparedEmail {
        target: SmtpTarget {
            host: host.to_string(),
            port,
            username: sender.to_string(),
            password: req.smtp_password.clone(),
        },
        recipients,
        message,
    })
}

/// Validates share requests and hands them to a [`MailTransport`] exactly once.
pub struct NotificationDispatcher {
    transport: Box<dyn MailTransport>,
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new(Box::new(SmtpsTransport))
    }
}

impl NotificationDispatcher {
    pub fn new(transport: Box<dyn MailTransport>) -> Self {
        Self { transport }
    }

    /// Single send attempt. Validation failures never reach the transport; no retry.
    pub async fn send(&self, req: &EmailRequest) -> Result<(), SendError> {
        ensure_metrics_described();

        let prepared = prepare(req)?;
        let recipients = prepared.recipients.len();
        let host = prepared.target.host.clone();

        match self.transport.deliver(&prepared.target, prepared.message).await {
            Ok(()) => {
                counter!("notify_sent_total").increment(1);
                tracing::info!(target: "notify", %host, recipients, "report sent");
                Ok(())
            }
            Err(msg) => {
                counter!("notify_failed_total").increment(1);
                tracing::warn!(target: "notify", %host, recipients, error = %msg, "report send failed");
                Err(SendError::TransportError(msg))
            }
        }
    }
}
