//! Outbound email for submitted intakes.
//!
//! Delivery is a [`Mailer`] sink. The crate ships [`LogMailer`], which only
//! logs, and [`Outbox`], which keeps every message in memory.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::summary::RenderedDocument;
use crate::{FormState, IntakeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("no recipient address")]
    NoRecipient,

    #[error("mailer unavailable: {0}")]
    Unavailable(String),
}

pub trait Mailer: Send + Sync {
    /// # Errors
    ///
    /// Returns [`MailError`] if the message was not accepted for delivery.
    fn send(&self, email: &Email) -> Result<(), MailError>;
}

impl<M: Mailer + ?Sized> Mailer for Arc<M> {
    fn send(&self, email: &Email) -> Result<(), MailError> {
        (**self).send(email)
    }
}

/// Logs each message instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: &Email) -> Result<(), MailError> {
        if email.to.is_empty() {
            return Err(MailError::NoRecipient);
        }
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            attachments = email.attachments.len(),
            "email queued"
        );
        Ok(())
    }
}

/// Collects sent messages in memory.
#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<Email>>,
}

impl Outbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Mailer for Outbox {
    fn send(&self, email: &Email) -> Result<(), MailError> {
        if email.to.is_empty() {
            return Err(MailError::NoRecipient);
        }
        self.sent
            .lock()
            .map_err(|_| MailError::Unavailable("outbox lock poisoned".to_owned()))?
            .push(email.clone());
        Ok(())
    }
}

/// Addresses and branding shared by both notifications.
#[derive(Debug, Clone, Copy)]
pub struct Sender<'a> {
    pub firm_name: &'a str,
    pub from: &'a str,
    pub admin: &'a str,
}

fn attachment(form: &FormState, intake_id: &IntakeId, document: &RenderedDocument) -> Attachment {
    Attachment {
        filename: format!(
            "TaxIntake_{}_{}.{}",
            form.get_str("lastName").unwrap_or_default(),
            intake_id,
            document.extension
        ),
        content_type: document.content_type.to_owned(),
        content: document.bytes.clone(),
    }
}

fn field(form: &FormState, path: &str) -> String {
    match form.get(path) {
        Some(crate::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Message to firm staff announcing a new intake.
#[must_use]
pub fn admin_notification(
    sender: Sender<'_>,
    form: &FormState,
    intake_id: &IntakeId,
    submitted_at: DateTime<Utc>,
    document: &RenderedDocument,
) -> Email {
    let first = field(form, "firstName");
    let last = field(form, "lastName");
    let mut body = String::new();
    let _ = writeln!(body, "New Tax Intake Submitted");
    let _ = writeln!(body);
    let _ = writeln!(body, "Intake ID: {intake_id}");
    let _ = writeln!(body, "Client: {first} {last}");
    let _ = writeln!(body, "Email: {}", field(form, "email"));
    let _ = writeln!(body, "Tax Year: {}", field(form, "taxYear"));
    let _ = writeln!(body, "Province: {}", field(form, "province"));
    let _ = writeln!(body, "Submitted: {}", submitted_at.to_rfc3339());
    let _ = writeln!(body);
    let _ = write!(body, "Please review the attached summary and begin tax preparation.");

    Email {
        from: sender.from.to_owned(),
        to: sender.admin.to_owned(),
        subject: format!(
            "New {} Tax Intake - {first} {last} - {intake_id}",
            short_name(sender.firm_name)
        ),
        body,
        attachments: vec![attachment(form, intake_id, document)],
    }
}

/// Receipt sent to the address the client entered.
#[must_use]
pub fn client_confirmation(
    sender: Sender<'_>,
    form: &FormState,
    intake_id: &IntakeId,
    submitted_at: DateTime<Utc>,
    document: &RenderedDocument,
) -> Email {
    let mut body = String::new();
    let _ = writeln!(body, "Thank you for your tax intake submission!");
    let _ = writeln!(body);
    let _ = writeln!(body, "Dear {},", field(form, "firstName"));
    let _ = writeln!(
        body,
        "We've successfully received your tax intake information. Our team will review \
         everything and begin preparing your tax return."
    );
    let _ = writeln!(body);
    let _ = writeln!(body, "Intake ID: {intake_id}");
    let _ = writeln!(body, "Tax Year: {}", field(form, "taxYear"));
    let _ = writeln!(body, "Submitted: {}", submitted_at.to_rfc3339());
    let _ = writeln!(body);
    let _ = writeln!(
        body,
        "Please keep your Intake ID for reference. If you have any questions, contact us at \
         {} with your Intake ID.",
        sender.admin
    );
    let _ = writeln!(body);
    let _ = write!(body, "Thank you for choosing {}!", sender.firm_name);

    Email {
        from: sender.from.to_owned(),
        to: field(form, "email"),
        subject: format!(
            "Your {} Tax Intake Confirmation - {intake_id}",
            short_name(sender.firm_name)
        ),
        body,
        attachments: vec![attachment(form, intake_id, document)],
    }
}

// "BTown Accounting" -> "BTown"
fn short_name(firm_name: &str) -> &str {
    firm_name.split_whitespace().next().unwrap_or(firm_name)
}
