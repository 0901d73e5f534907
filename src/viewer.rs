//! The profile viewer: hydrates the handed-off record, renders it and exports it.
//!
//! ```text
//! Loading ──record──▶ Ready ◀──finish── Exporting
//!    │                  └──begin_export──▶ ┘
//!    └──missing/malformed──▶ RedirectHome
//! ```
//!
//! A viewer opened with the direct download flag exports once, right after
//! its first render completes ([`ProfileViewer::after_render`]).

use log::{debug, info, warn};
use thiserror::Error;

use crate::document::ProfileDocument;
use crate::export::{Clock, ExportError, ExportReport, ExportSink, Exporter};
use crate::handoff::{LoadError, ProfileHandoff};
use crate::navigation::{Navigator, Notifier, Route};
use crate::pdf::PageAssembler;
use crate::raster::Rasterizer;
use crate::record::ProfileRecord;
use crate::store::KeyValueStore;

pub const NO_DATA_MESSAGE: &str = "No user data found. Please fill in the form first.";
pub const LOAD_FAILED_MESSAGE: &str = "Error loading data. Please try again.";
pub const NOT_READY_MESSAGE: &str = "Error: Content not ready for PDF generation";
pub const EXPORT_FAILED_MESSAGE: &str = "Error generating PDF. Please try again.";
pub const EXPORT_DONE_MESSAGE: &str = "PDF downloaded successfully!";

/// Lifecycle of a viewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Ready,
    Exporting,
    /// Terminal: control went back to the intake form.
    RedirectHome,
}

/// Why the viewer could not show a record.
#[derive(Debug, Error)]
pub enum HydrationError {
    #[error("no profile record has been submitted")]
    Missing,
    #[error("failed to load the profile record")]
    Failed(#[from] LoadError),
}

/// Proof that an export is running. Hand it back through
/// [`ProfileViewer::finish_export`] to return to [`ViewState::Ready`].
#[must_use = "an export session keeps the viewer busy until it is finished"]
#[derive(Debug)]
pub struct ExportSession {
    record: ProfileRecord,
}

impl ExportSession {
    /// The record being exported.
    pub fn record(&self) -> &ProfileRecord {
        &self.record
    }
}

/// Viewer state machine.
#[derive(Debug)]
pub struct ProfileViewer {
    state: ViewState,
    record: Option<ProfileRecord>,
    auto_export: bool,
}

impl Default for ProfileViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileViewer {
    /// Creates a viewer in [`ViewState::Loading`].
    pub fn new() -> Self {
        Self {
            state: ViewState::Loading,
            record: None,
            auto_export: false,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    /// The hydrated record, once loaded.
    pub fn record(&self) -> Option<&ProfileRecord> {
        self.record.as_ref()
    }

    /// Whether an automatic export is waiting for the first render.
    pub fn auto_export_pending(&self) -> bool {
        self.auto_export
    }

    /// Reads the record and the one-shot flag from the handoff.
    ///
    /// Only acts in [`ViewState::Loading`]. On failure the user is alerted and
    /// sent back to the intake form.
    pub fn load<S: KeyValueStore>(
        &mut self,
        handoff: &mut ProfileHandoff<S>,
        navigator: &mut dyn Navigator,
        notifier: &mut dyn Notifier,
    ) -> Result<(), HydrationError> {
        if self.state != ViewState::Loading {
            return Ok(());
        }

        match hydrate(handoff) {
            Ok((record, direct_download)) => {
                debug!(
                    "loaded profile for '{}' (direct download: {direct_download})",
                    record.name()
                );
                self.record = Some(record);
                self.auto_export = direct_download;
                self.state = ViewState::Ready;
                Ok(())
            }
            Err(err) => {
                let message = match err {
                    HydrationError::Missing => NO_DATA_MESSAGE,
                    HydrationError::Failed(_) => LOAD_FAILED_MESSAGE,
                };
                warn!("cannot show profile: {err}");
                notifier.alert(message);
                self.state = ViewState::RedirectHome;
                navigator.navigate(Route::IntakeForm);
                Err(err)
            }
        }
    }

    /// Renders the loaded record, `None` before loading or after a redirect.
    pub fn render(&self, clock: &dyn Clock) -> Option<ProfileDocument> {
        match self.state {
            ViewState::Ready | ViewState::Exporting => self
                .record
                .as_ref()
                .map(|record| ProfileDocument::from_record(record, clock.display_date())),
            ViewState::Loading | ViewState::RedirectHome => None,
        }
    }

    /// Post-render hook. Returns `true` exactly once when the viewer was opened
    /// for a direct download and is ready to export.
    pub fn after_render(&mut self) -> bool {
        if self.state == ViewState::Ready && self.auto_export {
            self.auto_export = false;
            true
        } else {
            false
        }
    }

    /// Moves from Ready to Exporting.
    pub fn begin_export(&mut self) -> Result<ExportSession, ExportError> {
        match (self.state, &self.record) {
            (ViewState::Ready, Some(record)) => {
                let session = ExportSession {
                    record: record.clone(),
                };
                self.state = ViewState::Exporting;
                Ok(session)
            }
            (ViewState::Exporting, _) => Err(ExportError::InProgress),
            _ => Err(ExportError::NotReady),
        }
    }

    /// Ends an export and returns to Ready.
    pub fn finish_export(&mut self, _session: ExportSession) {
        if self.state == ViewState::Exporting {
            self.state = ViewState::Ready;
        }
    }

    /// Runs a complete export and reports the outcome to the user.
    ///
    /// A request while another export runs is refused without a message, the
    /// way a disabled download button ignores clicks.
    pub fn export<R, A, K>(
        &mut self,
        exporter: &mut Exporter<R, A, K>,
        clock: &dyn Clock,
        notifier: &mut dyn Notifier,
    ) -> Result<ExportReport, ExportError>
    where
        R: Rasterizer,
        A: PageAssembler,
        K: ExportSink,
    {
        let session = match self.begin_export() {
            Ok(session) => session,
            Err(ExportError::NotReady) => {
                notifier.alert(NOT_READY_MESSAGE);
                return Err(ExportError::NotReady);
            }
            Err(err) => return Err(err),
        };

        let document = ProfileDocument::from_record(session.record(), clock.display_date());
        let result = exporter.run(&document, session.record().name(), clock.file_date());
        self.finish_export(session);

        match result {
            Ok(report) => {
                info!("exported profile to {}", report.location.display());
                notifier.confirm(EXPORT_DONE_MESSAGE);
                Ok(report)
            }
            Err(err) => {
                warn!("error generating PDF: {err}");
                notifier.alert(EXPORT_FAILED_MESSAGE);
                Err(err)
            }
        }
    }
}

fn hydrate<S: KeyValueStore>(
    handoff: &mut ProfileHandoff<S>,
) -> Result<(ProfileRecord, bool), HydrationError> {
    let record = handoff.load_record()?.ok_or(HydrationError::Missing)?;
    let direct_download = handoff
        .take_direct_download()
        .map_err(|err| HydrationError::Failed(LoadError::Store(err)))?;
    Ok((record, direct_download))
}
