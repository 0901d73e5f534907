//! Font discovery and loading for the PDF document and the rasterizer.
//!
//! Both consumers use the bundled Roboto family.  The directory holding the
//! TrueType files is searched in this order:
//!
//! 1. a directory passed explicitly by the caller,
//! 2. the `PROFILE_PDF_FONTS_DIR` environment variable,
//! 3. `assets/fonts` next to the running executable,
//! 4. `assets/fonts` inside the crate manifest directory.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::fonts::{self, FontData, FontFamily};
use log::debug;
use thiserror::Error;

/// Name of the bundled font family.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "Roboto";

/// Environment variable overriding the font directory.
pub const FONTS_DIR_ENV: &str = "PROFILE_PDF_FONTS_DIR";

const FONT_FILES: &[&str] = &[
    "Roboto-Regular.ttf",
    "Roboto-Bold.ttf",
    "Roboto-Italic.ttf",
    "Roboto-BoldItalic.ttf",
];

const REGULAR_FILE: &str = "Roboto-Regular.ttf";
const BOLD_FILE: &str = "Roboto-Bold.ttf";

/// Failures while locating or loading fonts.
#[derive(Debug, Error)]
pub enum FontError {
    #[error("Unable to locate font directory. Checked: {0}. Set PROFILE_PDF_FONTS_DIR or copy assets/fonts next to the binary.")]
    NotFound(String),
    #[error("Failed to load font family '{family}' from {}: {source}", .directory.display())]
    Family {
        family: &'static str,
        directory: PathBuf,
        #[source]
        source: genpdf::error::Error,
    },
    #[error("Failed to read font file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Font file {} is not a usable TrueType font", .path.display())]
    Invalid { path: PathBuf },
}

/// The two faces the rasterizer draws with.
pub struct RasterFaces {
    pub regular: rusttype::Font<'static>,
    pub bold: rusttype::Font<'static>,
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var).and_then(|value| {
        let path = PathBuf::from(value);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    })
}

fn font_directory_candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    let mut push = |candidate: PathBuf| {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    };

    if let Some(path) = explicit {
        push(path.to_path_buf());
    }

    if let Some(path) = env_path(FONTS_DIR_ENV) {
        push(path);
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            push(bin_dir.join("assets/fonts"));
        }
    }

    push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts"));

    candidates
}

fn missing_font_files(path: &Path) -> Vec<&'static str> {
    FONT_FILES
        .iter()
        .copied()
        .filter(|name| !path.join(name).is_file())
        .collect()
}

/// Returns the first candidate directory that holds every font file.
pub fn resolve_font_directory(explicit: Option<&Path>) -> Result<PathBuf, FontError> {
    let mut attempts = Vec::new();

    for candidate in font_directory_candidates(explicit) {
        if !candidate.is_dir() {
            attempts.push(format!("{} (directory missing)", candidate.display()));
            continue;
        }

        let missing = missing_font_files(&candidate);
        if missing.is_empty() {
            debug!("using fonts from {}", candidate.display());
            return Ok(candidate);
        }

        attempts.push(format!(
            "{} (missing files [{}])",
            candidate.display(),
            missing.join(", ")
        ));
    }

    Err(FontError::NotFound(attempts.join(", ")))
}

/// Loads the Roboto family for a `genpdf` document.
pub fn default_font_family(explicit: Option<&Path>) -> Result<FontFamily<FontData>, FontError> {
    let directory = resolve_font_directory(explicit)?;

    fonts::from_files(&directory, DEFAULT_FONT_FAMILY_NAME, None).map_err(|source| {
        FontError::Family {
            family: DEFAULT_FONT_FAMILY_NAME,
            directory,
            source,
        }
    })
}

fn load_raster_face(directory: &Path, file: &str) -> Result<rusttype::Font<'static>, FontError> {
    let path = directory.join(file);
    let bytes = fs::read(&path).map_err(|source| FontError::Read {
        path: path.clone(),
        source,
    })?;
    rusttype::Font::try_from_vec(bytes).ok_or(FontError::Invalid { path })
}

/// Loads the regular and bold faces used by the rasterizer.
pub fn load_raster_faces(explicit: Option<&Path>) -> Result<RasterFaces, FontError> {
    let directory = resolve_font_directory(explicit)?;
    Ok(RasterFaces {
        regular: load_raster_face(&directory, REGULAR_FILE)?,
        bold: load_raster_face(&directory, BOLD_FILE)?,
    })
}

/// Indicates whether the default font directory can be resolved.
pub fn default_fonts_available() -> bool {
    resolve_font_directory(None).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directory_is_searched_first() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = font_directory_candidates(Some(dir.path()));
        assert_eq!(candidates.first().map(PathBuf::as_path), Some(dir.path()));
    }

    #[test]
    fn incomplete_directory_is_not_resolved_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(REGULAR_FILE), b"").unwrap();
        assert_eq!(missing_font_files(dir.path()).len(), FONT_FILES.len() - 1);
    }

    #[test]
    fn invalid_font_bytes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(REGULAR_FILE), b"not a font").unwrap();
        assert!(matches!(
            load_raster_face(dir.path(), REGULAR_FILE),
            Err(FontError::Invalid { .. })
        ));
        assert!(matches!(
            load_raster_face(dir.path(), BOLD_FILE),
            Err(FontError::Read { .. })
        ));
    }
}
