//! Core types shared by the engine and the drivers.
//!
//! - [`value`]: owned SQL cell values and the row type
//! - [`traits`]: connection seams implemented by `drivers`

pub mod traits;
pub mod value;

pub use traits::{Connector, DestinationSession, SourceSession};
pub use value::{Row, SqlNullType, SqlValue};
