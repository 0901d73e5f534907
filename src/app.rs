//! Wires the two screens to a file-backed store and the PDF export pipeline.

use log::debug;

use crate::config::Settings;
use crate::document::ProfileDocument;
use crate::error::Result;
use crate::export::{Clock, DirectorySink, ExportReport, Exporter, SystemClock};
use crate::handoff::ProfileHandoff;
use crate::intake::{IntakeForm, SubmitIntent};
use crate::navigation::{Notifier, PendingRoute, Route};
use crate::pdf::{GenpdfAssembler, PageAssembler};
use crate::raster::{GlyphRasterizer, Rasterizer};
use crate::store::FileStore;
use crate::viewer::ProfileViewer;

/// What a viewer session produced.
#[derive(Debug)]
pub struct ViewOutcome {
    pub document: ProfileDocument,
    pub export: Option<ExportReport>,
}

/// The application: an intake form and a viewer sharing one handoff store.
pub struct App<N> {
    settings: Settings,
    notifier: N,
    clock: Box<dyn Clock>,
    rasterizer: Box<dyn Rasterizer>,
    assembler: Box<dyn PageAssembler>,
}

impl<N: Notifier> App<N> {
    /// Creates an app exporting through the glyph rasterizer and genpdf.
    pub fn new(settings: Settings, notifier: N) -> Self {
        let rasterizer = GlyphRasterizer::new(settings.fonts_dir.clone());
        let assembler = GenpdfAssembler::new(settings.page_format, settings.orientation)
            .with_title(crate::document::DOCUMENT_TITLE)
            .with_fonts_dir(settings.fonts_dir.clone());
        Self {
            settings,
            notifier,
            clock: Box::new(SystemClock),
            rasterizer: Box::new(rasterizer),
            assembler: Box::new(assembler),
        }
    }

    /// Replaces the rasterizer and the page assembler used by exports.
    pub fn with_pipeline(
        mut self,
        rasterizer: impl Rasterizer + 'static,
        assembler: impl PageAssembler + 'static,
    ) -> Self {
        self.rasterizer = Box::new(rasterizer);
        self.assembler = Box::new(assembler);
        self
    }

    /// Replaces the system clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn handoff(&self) -> ProfileHandoff<FileStore> {
        ProfileHandoff::new(FileStore::new(&self.settings.store_dir))
    }

    /// Submits `form` and, on success, follows the navigation into the viewer.
    ///
    /// `present` is called with the rendered document before any export starts.
    pub fn submit(
        &mut self,
        form: &IntakeForm,
        intent: SubmitIntent,
        present: impl FnOnce(&ProfileDocument),
    ) -> Result<Option<ViewOutcome>> {
        let mut handoff = self.handoff();
        let mut navigator = PendingRoute::new();
        form.submit(intent, &mut handoff, &mut navigator, &mut self.notifier)?;

        match navigator.take() {
            Some(Route::ProfileView) => self.view(false, present).map(Some),
            Some(Route::IntakeForm) | None => Ok(None),
        }
    }

    /// Opens the viewer on the stored record.
    ///
    /// The export runs after `present` returns, either because the record was
    /// submitted for direct download or because `download` asks for it.
    pub fn view(
        &mut self,
        download: bool,
        present: impl FnOnce(&ProfileDocument),
    ) -> Result<ViewOutcome> {
        let mut handoff = self.handoff();
        let mut navigator = PendingRoute::new();
        let mut viewer = ProfileViewer::new();
        viewer.load(&mut handoff, &mut navigator, &mut self.notifier)?;

        let document = viewer
            .render(self.clock.as_ref())
            .ok_or(crate::export::ExportError::NotReady)?;
        present(&document);

        let automatic = viewer.after_render();
        debug!("view rendered (automatic export: {automatic}, requested: {download})");

        let export = if automatic || download {
            let mut exporter = Exporter::new(
                self.rasterizer.as_ref(),
                self.assembler.as_ref(),
                DirectorySink::new(&self.settings.output_dir),
            );
            Some(viewer.export(&mut exporter, self.clock.as_ref(), &mut self.notifier)?)
        } else {
            None
        };

        Ok(ViewOutcome { document, export })
    }

    /// Removes the stored record and the direct download flag.
    pub fn clear(&mut self) -> Result<()> {
        self.handoff().clear()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::document::ProfileDocument;
    use crate::export::FixedClock;
    use crate::navigation::MessageLog;
    use crate::pdf::{AssembleError, PageSize, Placement};
    use crate::raster::{CaptureError, CaptureOptions};
    use crate::record::Field;
    use crate::store::STORE_FILE_NAME;
    use crate::viewer::{HydrationError, EXPORT_DONE_MESSAGE, NO_DATA_MESSAGE};
    use chrono::NaiveDate;
    use image::DynamicImage;

    struct BlankRaster;

    impl Rasterizer for BlankRaster {
        fn capture(
            &self,
            _document: &ProfileDocument,
            _options: &CaptureOptions,
        ) -> std::result::Result<DynamicImage, CaptureError> {
            Ok(DynamicImage::new_rgb8(1600, 1000))
        }
    }

    struct StubPdf;

    impl PageAssembler for StubPdf {
        fn page_size(&self) -> PageSize {
            PageSize::new(210.0, 297.0)
        }

        fn assemble(
            &self,
            _raster: DynamicImage,
            _placement: Placement,
        ) -> std::result::Result<Vec<u8>, AssembleError> {
            Ok(b"%PDF-1.3".to_vec())
        }
    }

    fn app(dir: &std::path::Path) -> App<MessageLog> {
        let settings = Settings::new(dir.join("store")).with_output_dir(dir.join("out"));
        App::new(settings, MessageLog::new())
            .with_clock(FixedClock(NaiveDate::from_ymd_opt(2025, 1, 5).unwrap()))
            .with_pipeline(BlankRaster, StubPdf)
    }

    fn exported_files(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir.join("out"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    fn form() -> IntakeForm {
        let mut form = IntakeForm::new();
        form.update_field(Field::Name, "Jane Doe");
        form.update_field(Field::Email, "jane@x.com");
        form.update_field(Field::Phone, "555-1234");
        form.update_field(Field::Position, "Engineer");
        form
    }

    #[test]
    fn preview_submission_renders_without_exporting() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        let mut presented = None;

        let outcome = app
            .submit(&form(), SubmitIntent::Preview, |document| {
                presented = Some(document.blocks().len())
            })
            .unwrap()
            .unwrap();

        assert_eq!(presented, Some(4));
        assert!(outcome.export.is_none());
        assert_eq!(outcome.document.footer(), "Generated on January 5, 2025");
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn direct_download_exports_once_after_the_render() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        let mut presented = false;

        let outcome = app
            .submit(&form(), SubmitIntent::DirectDownload, |_| presented = true)
            .unwrap()
            .unwrap();

        assert!(presented);
        let report = outcome.export.unwrap();
        assert_eq!(report.file_name, "Jane_Doe_details_2025-01-05.pdf");
        assert_eq!(report.location, dir.path().join("out").join(&report.file_name));
        assert_eq!(exported_files(dir.path()), 1);
        assert_eq!(app.notifier().confirmations(), [EXPORT_DONE_MESSAGE]);

        let again = app.view(false, |_| {}).unwrap();
        assert!(again.export.is_none());
        assert_eq!(exported_files(dir.path()), 1);
        assert_eq!(app.notifier().confirmations().len(), 1);
    }

    #[test]
    fn requested_download_exports_a_previewed_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.submit(&form(), SubmitIntent::Preview, |_| {}).unwrap();
        assert_eq!(exported_files(dir.path()), 0);

        let outcome = app.view(true, |_| {}).unwrap();
        assert!(outcome.export.is_some());
        assert_eq!(exported_files(dir.path()), 1);
    }

    #[test]
    fn corrupt_store_does_not_block_submission() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("store")).unwrap();
        std::fs::write(
            dir.path().join("store").join(STORE_FILE_NAME),
            "{\"userData\": ",
        )
        .unwrap();
        let mut app = app(dir.path());

        let outcome = app
            .submit(&form(), SubmitIntent::Preview, |_| {})
            .unwrap()
            .unwrap();

        assert_eq!(outcome.document.blocks().len(), 4);
        assert!(app.notifier().alerts().is_empty());
    }

    #[test]
    fn viewing_without_a_record_redirects() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());

        let err = app.view(true, |_| panic!("nothing to present")).unwrap_err();
        assert!(matches!(err, Error::Hydration(HydrationError::Missing)));
        assert_eq!(app.notifier().last_alert(), Some(NO_DATA_MESSAGE));
    }

    #[test]
    fn clear_forgets_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.submit(&form(), SubmitIntent::Preview, |_| {}).unwrap();

        app.clear().unwrap();
        assert!(app.view(false, |_| {}).is_err());
    }
}
