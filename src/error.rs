//! Crate-level error type.

use thiserror::Error;

use crate::crs::CrsError;
use crate::geojson::{LoadError, SaveError};
use crate::pip::OverlayError;

/// Any failure that ends a flood overlay run
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Crs(#[from] CrsError),
    #[error(transparent)]
    Overlay(#[from] OverlayError),
    #[error(transparent)]
    Save(#[from] SaveError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
