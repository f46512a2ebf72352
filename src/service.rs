//! Draft handling and submission, wired to the configured collaborators.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::IntakeConfig;
use crate::notify::{self, Mailer, Sender};
use crate::standard::standard_rules;
use crate::steps::{self, Progress};
use crate::summary::{RenderError, Summary, SummaryRenderer};
use crate::validate::{validate, ValidationErrors};
use crate::{
    Draft, DraftError, DraftId, DraftStore, FormState, IntakeError, IntakeId, RuleSet, Visibility,
};

/// Shown to the client once an intake is accepted.
pub const SUBMITTED_MESSAGE: &str = "Tax intake submitted successfully";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub intake_id: IntakeId,
    pub submitted_at: DateTime<Utc>,
    pub message: String,
}

pub struct IntakeService {
    config: IntakeConfig,
    rules: RuleSet,
    drafts: Box<dyn DraftStore>,
    renderer: Box<dyn SummaryRenderer>,
    mailer: Box<dyn Mailer>,
}

impl IntakeService {
    /// Build a service, loading `config.rules_file` or the standard rule table.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError`] if the rule file cannot be read, parsed, or
    /// compiled.
    pub fn new(
        config: IntakeConfig,
        drafts: Box<dyn DraftStore>,
        renderer: Box<dyn SummaryRenderer>,
        mailer: Box<dyn Mailer>,
    ) -> Result<Self, IntakeError> {
        let rules = match &config.rules_file {
            Some(path) => RuleSet::from_file(path)?,
            None => standard_rules()?,
        };
        tracing::debug!(%rules, "intake service ready");
        Ok(Self {
            config,
            rules,
            drafts,
            renderer,
            mailer,
        })
    }

    #[must_use]
    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    #[must_use]
    pub fn visibility(&self, form: &FormState) -> Visibility<'_> {
        self.rules.evaluate(form)
    }

    #[must_use]
    pub fn visible_fields(&self, form: &FormState) -> BTreeSet<String> {
        self.rules.visible_fields(form)
    }

    #[must_use]
    pub fn progress(&self, form: &FormState) -> Progress {
        steps::progress(form)
    }

    /// Store `form` as a new draft.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError`] if the store rejects the write.
    pub fn save_draft(&self, form: FormState, now: DateTime<Utc>) -> Result<DraftId, DraftError> {
        let draft = Draft::new(form, now);
        self.drafts.save(&draft)?;
        tracing::info!(draft = %draft.id, fields = draft.form.len(), "draft saved");
        Ok(draft.id)
    }

    /// Replace the contents of an existing draft id.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError`] if the store rejects the write.
    pub fn update_draft(
        &self,
        id: &DraftId,
        form: FormState,
        now: DateTime<Utc>,
    ) -> Result<(), DraftError> {
        let draft = Draft {
            id: id.clone(),
            form,
            saved_at: now,
        };
        self.drafts.save(&draft)
    }

    /// Fetch a draft. Drafts older than the configured max age are deleted
    /// and read as absent.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError`] if the store cannot be read.
    pub fn load_draft(&self, id: &DraftId, now: DateTime<Utc>) -> Result<Option<Draft>, DraftError> {
        let draft = self.drafts.load(id)?;
        self.unexpired(draft, now)
    }

    /// The most recently saved draft, subject to the same expiry as
    /// [`load_draft`](Self::load_draft).
    ///
    /// # Errors
    ///
    /// Returns [`DraftError`] if the store cannot be read.
    pub fn latest_draft(&self, now: DateTime<Utc>) -> Result<Option<Draft>, DraftError> {
        let draft = self.drafts.latest()?;
        self.unexpired(draft, now)
    }

    fn unexpired(
        &self,
        draft: Option<Draft>,
        now: DateTime<Utc>,
    ) -> Result<Option<Draft>, DraftError> {
        match draft {
            Some(draft) if draft.is_expired(now, self.config.draft_max_age()) => {
                tracing::info!(draft = %draft.id, saved_at = %draft.saved_at, "draft expired");
                self.drafts.remove(&draft.id)?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// # Errors
    ///
    /// Returns [`DraftError`] if the store cannot delete the draft.
    pub fn discard_draft(&self, id: &DraftId) -> Result<bool, DraftError> {
        self.drafts.remove(id)
    }

    /// Validate, assign an intake id, render the summary and notify staff
    /// and client.
    ///
    /// `timestamp` defaults to now; its year goes into the intake id and its
    /// date is the reference for the age check. Mail failures are logged and
    /// do not fail the submission.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Invalid`] with every validation failure, or
    /// [`SubmitError::Render`] if the summary cannot be rendered.
    pub fn submit(
        &self,
        form: &FormState,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<SubmitReceipt, SubmitError> {
        let submitted_at = timestamp.unwrap_or_else(Utc::now);
        validate(form, submitted_at.date_naive())?;

        let intake_id = IntakeId::generate(&self.config.id_prefix, submitted_at.year());
        let summary = Summary::build(form, intake_id.clone(), submitted_at.date_naive());
        let document = self.renderer.render(&summary)?;

        let sender = Sender {
            firm_name: &self.config.firm_name,
            from: &self.config.from_email,
            admin: &self.config.admin_email,
        };
        let emails = [
            notify::admin_notification(sender, form, &intake_id, submitted_at, &document),
            notify::client_confirmation(sender, form, &intake_id, submitted_at, &document),
        ];
        for email in &emails {
            if let Err(e) = self.mailer.send(email) {
                tracing::warn!(intake = %intake_id, to = %email.to, error = %e, "email failed");
            }
        }

        tracing::info!(intake = %intake_id, "intake submitted");
        Ok(SubmitReceipt {
            intake_id,
            submitted_at,
            message: SUBMITTED_MESSAGE.to_owned(),
        })
    }
}
