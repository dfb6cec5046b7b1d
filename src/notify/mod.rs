// src/notify/mod.rs
pub mod email;

use crate::filter::DateRange;

pub use email::{EmailRequest, MailTransport, NotificationDispatcher, SendError, SmtpsTransport};

/// Naming used in shared reports: subject/body label and attachment file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContext {
    pub label: String,
    pub file_stem: String,
}

impl Default for ReportContext {
    fn default() -> Self {
        Self {
            label: "Mentions".to_string(),
            file_stem: "mentions_filtered".to_string(),
        }
    }
}

impl ReportContext {
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.file_stem)
    }

    pub fn subject(&self, range: &DateRange, mentions: usize) -> String {
        format!(
            "{} Report: {} to {} ({} mentions)",
            self.label, range.start, range.end, mentions
        )
    }

    pub fn body(&self) -> String {
        format!("Attached is the {} mentions report (CSV).", self.label)
    }
}
