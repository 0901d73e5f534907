//! Core entry point for the profile_pdf crate.
//!
//! An [`intake::IntakeForm`] validates a [`record::ProfileRecord`] and hands it
//! over through a [`handoff::ProfileHandoff`]; a [`viewer::ProfileViewer`]
//! picks it up, renders a [`document::ProfileDocument`] and exports it as a
//! one-page PDF through [`export::Exporter`].

pub mod app;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod fonts;
pub mod handoff;
pub mod intake;
pub mod navigation;
pub mod pdf;
pub mod raster;
pub mod record;
pub mod store;
pub mod viewer;

pub use error::{Error, Result};
