//! Crate-wide error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::export::ExportError;
use crate::intake::IntakeError;
use crate::store::StoreError;
use crate::viewer::HydrationError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("profile was not submitted")]
    Intake(#[from] IntakeError),
    #[error("profile could not be shown")]
    Hydration(#[from] HydrationError),
    #[error("profile could not be exported")]
    Export(#[from] ExportError),
    #[error("handoff store failed")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
