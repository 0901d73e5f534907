//! The export pipeline: capture, place on a page, assemble and save.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{Local, NaiveDate, Utc};
use image::GenericImageView;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::document::ProfileDocument;
use crate::pdf::{fit_to_page, AssembleError, PageAssembler, Placement};
use crate::raster::{CaptureError, CaptureOptions, Rasterizer};

/// Literal placed between the name and the date in exported file names.
pub const FILE_NAME_SUFFIX: &str = "_details_";

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\s\x{FEFF}]+").expect("whitespace pattern is a valid regex")
});

static UNSAFE_CHAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[/\\:*?"<>|\x00-\x1F\x7F]"#)
        .expect("unsafe character pattern is a valid regex")
});

/// Builds `<name>_details_<YYYY-MM-DD>.pdf`.
///
/// Every whitespace run in the name becomes a single underscore, and so does
/// every path separator or other character file systems reject. The suffix
/// keeps the result from ever being `.` or `..`.
pub fn export_file_name(name: &str, date: NaiveDate) -> String {
    let name = WHITESPACE_RUN.replace_all(name, "_");
    let name = UNSAFE_CHAR.replace_all(&name, "_");
    format!("{name}{FILE_NAME_SUFFIX}{}.pdf", date.format("%Y-%m-%d"))
}

fn is_plain_file_name(file_name: &str) -> bool {
    let mut components = Path::new(file_name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Source of the calendar dates used by an export.
pub trait Clock {
    /// Date stamped into the file name (UTC calendar day).
    fn file_date(&self) -> NaiveDate;

    /// Date printed in the document footer (local calendar day).
    fn display_date(&self) -> NaiveDate;
}

/// The system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn file_date(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    fn display_date(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock stuck on one day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn file_date(&self) -> NaiveDate {
        self.0
    }

    fn display_date(&self) -> NaiveDate {
        self.0
    }
}

/// Failures of an export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No record has been loaded into the viewer.
    #[error("content is not ready for PDF generation")]
    NotReady,
    /// Another export of the same record is still running.
    #[error("an export is already in progress")]
    InProgress,
    #[error("failed to capture the profile")]
    Capture(#[from] CaptureError),
    #[error("captured image is empty")]
    EmptyRaster,
    /// The export name would leave the output directory.
    #[error("'{0}' is not a plain file name")]
    InvalidFileName(String),
    #[error("failed to assemble the PDF")]
    Assemble(#[from] AssembleError),
    #[error("failed to save {}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Destination of exported files.
pub trait ExportSink {
    /// Stores `bytes` as `file_name` and returns where it ended up.
    fn save(&mut self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError>;
}

/// Writes exports into a directory.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    directory: PathBuf,
}

impl DirectorySink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl ExportSink for DirectorySink {
    fn save(&mut self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
        if !is_plain_file_name(file_name) {
            return Err(ExportError::InvalidFileName(file_name.to_owned()));
        }
        let path = self.directory.join(file_name);
        fs::create_dir_all(&self.directory)
            .and_then(|()| fs::write(&path, bytes))
            .map_err(|source| ExportError::Save {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

/// Result of a successful export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportReport {
    pub file_name: String,
    pub location: PathBuf,
    pub size: usize,
    pub placement: Placement,
}

/// Capture → place → assemble → save.
pub struct Exporter<R, A, K> {
    rasterizer: R,
    assembler: A,
    sink: K,
    options: CaptureOptions,
}

impl<R, A, K> Exporter<R, A, K>
where
    R: Rasterizer,
    A: PageAssembler,
    K: ExportSink,
{
    /// Creates an exporter with the default capture options.
    pub fn new(rasterizer: R, assembler: A, sink: K) -> Self {
        Self {
            rasterizer,
            assembler,
            sink,
            options: CaptureOptions::default(),
        }
    }

    /// Replaces the capture options.
    pub fn with_options(mut self, options: CaptureOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Exports `document` as `<name>_details_<file_date>.pdf`.
    pub fn run(
        &mut self,
        document: &ProfileDocument,
        name: &str,
        file_date: NaiveDate,
    ) -> Result<ExportReport, ExportError> {
        let raster = self.rasterizer.capture(document, &self.options)?;
        debug!("captured {}x{} px raster", raster.width(), raster.height());

        let page = self.assembler.page_size();
        let placement =
            fit_to_page(raster.width(), raster.height(), page).ok_or(ExportError::EmptyRaster)?;
        let bytes = self.assembler.assemble(raster, placement)?;

        let file_name = export_file_name(name, file_date);
        let location = self.sink.save(&file_name, &bytes)?;
        info!("saved {} ({} bytes)", location.display(), bytes.len());

        Ok(ExportReport {
            file_name,
            location,
            size: bytes.len(),
            placement,
        })
    }
}
