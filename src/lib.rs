#![doc = include_str!("../README.md")]

mod codec;
mod error;
pub mod metric;
pub mod orthtree;
mod r#type;

pub use codec::CoordinateCodec;
pub use error::{OrthtreeError, Result};
pub use r#type::{ItemRef, Location};
