//! Grammars of the supported file formats.
//!
//! Each format lives in its own module and registers itself in [`crate::FormatId`].

pub mod ttf;
