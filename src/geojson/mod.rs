//! GeoJSON load/save boundary.

mod read;
mod write;

pub use read::{from_reader, load, load_with, LoadError, LoadOptions};
pub use write::{save, save_with, CoordinateFields, SaveError};
