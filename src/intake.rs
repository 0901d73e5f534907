//! The intake form: collects a draft record, validates it and hands it to the viewer.

use log::{debug, warn};
use thiserror::Error;

use crate::handoff::ProfileHandoff;
use crate::navigation::{Navigator, Notifier, Route};
use crate::record::{Field, ProfileRecord, ValidationError};
use crate::store::{KeyValueStore, StoreError};

/// Message shown when the record could not be persisted.
pub const SAVE_FAILED_MESSAGE: &str = "Error saving data. Please try again.";

/// What the user wants to happen after submitting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitIntent {
    /// Open the viewer and let the user trigger the export.
    Preview,
    /// Open the viewer and export as soon as it has rendered.
    DirectDownload,
}

/// Why a submission was aborted. The user has already been notified.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("failed to save the profile record")]
    Save(#[source] StoreError),
}

/// In-memory draft of the form.
#[derive(Clone, Debug, Default)]
pub struct IntakeForm {
    draft: ProfileRecord,
}

impl IntakeForm {
    /// Creates a form with every field empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a form prefilled with `draft`.
    pub fn with_draft(draft: ProfileRecord) -> Self {
        Self { draft }
    }

    /// The current draft.
    pub fn draft(&self) -> &ProfileRecord {
        &self.draft
    }

    /// Replaces one field of the draft. No validation happens here.
    pub fn update_field(&mut self, field: Field, value: impl Into<String>) {
        self.draft.set(field, value);
    }

    /// Validates the draft, alerting the user on failure.
    pub fn validate(&self, notifier: &mut dyn Notifier) -> Result<(), ValidationError> {
        self.draft.validate().map_err(|err| {
            notifier.alert(&err.to_string());
            err
        })
    }

    /// Validates, persists and navigates to the viewer.
    ///
    /// Nothing is written and no navigation happens when validation fails.  A
    /// storage failure is reported with a generic message and leaves the draft
    /// untouched so the user can submit again.
    pub fn submit<S: KeyValueStore>(
        &self,
        intent: SubmitIntent,
        handoff: &mut ProfileHandoff<S>,
        navigator: &mut dyn Navigator,
        notifier: &mut dyn Notifier,
    ) -> Result<(), IntakeError> {
        self.validate(notifier)?;

        if let Err(err) = persist(&self.draft, intent, handoff) {
            warn!("error saving data: {err}");
            notifier.alert(SAVE_FAILED_MESSAGE);
            return Err(IntakeError::Save(err));
        }

        debug!("submitted profile with intent {intent:?}");
        navigator.navigate(Route::ProfileView);
        Ok(())
    }
}

fn persist<S: KeyValueStore>(
    record: &ProfileRecord,
    intent: SubmitIntent,
    handoff: &mut ProfileHandoff<S>,
) -> Result<(), StoreError> {
    handoff.store_record(record)?;
    if intent == SubmitIntent::DirectDownload {
        handoff.request_direct_download()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::{DIRECT_DOWNLOAD_KEY, RECORD_KEY};
    use crate::navigation::{MessageLog, PendingRoute};
    use crate::store::MemoryStore;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io {
                path: "quota".into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "quota exceeded"),
            })
        }

        fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }

        fn clear(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn filled_form() -> IntakeForm {
        let mut form = IntakeForm::new();
        form.update_field(Field::Name, "Jane Doe");
        form.update_field(Field::Email, "jane@x.com");
        form.update_field(Field::Phone, "555-1234");
        form.update_field(Field::Position, "Engineer");
        form
    }

    #[test]
    fn preview_persists_record_without_flag() {
        let form = filled_form();
        let mut handoff = ProfileHandoff::new(MemoryStore::new());
        let mut navigator = PendingRoute::new();
        let mut messages = MessageLog::new();

        form.submit(SubmitIntent::Preview, &mut handoff, &mut navigator, &mut messages)
            .unwrap();

        assert_eq!(handoff.load_record().unwrap().as_ref(), Some(form.draft()));
        assert_eq!(handoff.store().get(DIRECT_DOWNLOAD_KEY).unwrap(), None);
        assert_eq!(navigator.take(), Some(Route::ProfileView));
        assert!(messages.alerts().is_empty());
    }

    #[test]
    fn direct_download_sets_flag() {
        let form = filled_form();
        let mut handoff = ProfileHandoff::new(MemoryStore::new());
        let mut navigator = PendingRoute::new();
        let mut messages = MessageLog::new();

        form.submit(
            SubmitIntent::DirectDownload,
            &mut handoff,
            &mut navigator,
            &mut messages,
        )
        .unwrap();

        assert_eq!(
            handoff.store().get(DIRECT_DOWNLOAD_KEY).unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(navigator.take(), Some(Route::ProfileView));
    }

    #[test]
    fn invalid_email_blocks_submission() {
        let mut form = filled_form();
        form.update_field(Field::Email, "not-an-email");
        let mut handoff = ProfileHandoff::new(MemoryStore::new());
        let mut navigator = PendingRoute::new();
        let mut messages = MessageLog::new();

        let err = form
            .submit(SubmitIntent::Preview, &mut handoff, &mut navigator, &mut messages)
            .unwrap_err();

        assert!(matches!(err, IntakeError::Invalid(ValidationError::InvalidEmail)));
        assert!(handoff.store().is_empty());
        assert_eq!(navigator.peek(), None);
        assert_eq!(
            messages.last_alert(),
            Some("Please enter a valid email address")
        );
    }

    #[test]
    fn missing_fields_are_named_in_the_alert() {
        let mut form = filled_form();
        form.update_field(Field::Phone, "  ");
        form.update_field(Field::Name, "");
        let mut handoff = ProfileHandoff::new(MemoryStore::new());
        let mut navigator = PendingRoute::new();
        let mut messages = MessageLog::new();

        assert!(form
            .submit(
                SubmitIntent::DirectDownload,
                &mut handoff,
                &mut navigator,
                &mut messages
            )
            .is_err());

        assert_eq!(
            messages.alerts(),
            ["Please fill in the following required fields: name, phone"]
        );
        assert!(handoff.store().get(RECORD_KEY).unwrap().is_none());
        assert_eq!(navigator.peek(), None);
    }

    #[test]
    fn storage_failure_reports_and_stays() {
        let form = filled_form();
        let mut handoff = ProfileHandoff::new(BrokenStore);
        let mut navigator = PendingRoute::new();
        let mut messages = MessageLog::new();

        let err = form
            .submit(SubmitIntent::Preview, &mut handoff, &mut navigator, &mut messages)
            .unwrap_err();

        assert!(matches!(err, IntakeError::Save(_)));
        assert_eq!(messages.last_alert(), Some(SAVE_FAILED_MESSAGE));
        assert_eq!(navigator.peek(), None);
        assert_eq!(form.draft().name(), "Jane Doe");
    }

    #[test]
    fn resubmission_replaces_previous_record() {
        let mut form = filled_form();
        let mut handoff = ProfileHandoff::new(MemoryStore::new());
        let mut navigator = PendingRoute::new();
        let mut messages = MessageLog::new();

        form.submit(SubmitIntent::Preview, &mut handoff, &mut navigator, &mut messages)
            .unwrap();
        form.update_field(Field::Position, "Manager");
        form.submit(SubmitIntent::Preview, &mut handoff, &mut navigator, &mut messages)
            .unwrap();

        let stored = handoff.load_record().unwrap().unwrap();
        assert_eq!(stored.position(), "Manager");
    }
}
