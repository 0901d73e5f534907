//! Runtime settings: where the handoff store lives and where exports go.

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::pdf::{Orientation, PageFormat};

/// Environment variable overriding the store directory.
pub const STORE_DIR_ENV: &str = "PROFILE_PDF_STORE_DIR";

/// Directory created under the platform's local data directory.
pub const APP_DIR_NAME: &str = "profile-pdf";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no local data directory is known for this platform; pass --store-dir or set PROFILE_PDF_STORE_DIR")]
    NoDataDir,
}

/// Resolved settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub store_dir: PathBuf,
    pub output_dir: PathBuf,
    pub fonts_dir: Option<PathBuf>,
    pub page_format: PageFormat,
    pub orientation: Orientation,
}

/// Optional values collected from the command line.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub store_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub fonts_dir: Option<PathBuf>,
    pub page_format: Option<PageFormat>,
    pub orientation: Option<Orientation>,
}

impl Settings {
    /// Settings rooted at `store_dir`, writing exports into the working directory.
    pub fn new(store_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: store_dir.into(),
            output_dir: PathBuf::from("."),
            fonts_dir: None,
            page_format: PageFormat::default(),
            orientation: Orientation::default(),
        }
    }

    /// Resolves settings from command line values, then the environment, then defaults.
    pub fn resolve(overrides: Overrides) -> Result<Self, ConfigError> {
        let store_dir = match overrides.store_dir {
            Some(dir) => dir,
            None => default_store_dir(env::var_os(STORE_DIR_ENV).map(PathBuf::from), dirs::data_local_dir())?,
        };

        let mut settings = Self::new(store_dir);
        if let Some(output_dir) = overrides.output_dir {
            settings.output_dir = output_dir;
        }
        settings.fonts_dir = overrides.fonts_dir;
        settings.page_format = overrides.page_format.unwrap_or_default();
        settings.orientation = overrides.orientation.unwrap_or_default();
        Ok(settings)
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_fonts_dir(mut self, fonts_dir: impl Into<Option<PathBuf>>) -> Self {
        self.fonts_dir = fonts_dir.into();
        self
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }
}

fn default_store_dir(
    from_env: Option<PathBuf>,
    data_local_dir: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = from_env.filter(|dir| !dir.as_os_str().is_empty()) {
        return Ok(dir);
    }

    data_local_dir
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(ConfigError::NoDataDir)
}
