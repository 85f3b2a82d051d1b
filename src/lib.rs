// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![warn(missing_docs)]
//#![deny(unsafe_code)]
// - 'stream/physical.rs' uses mmap to map a file into memory

//! # fieldscope
//!
//! [![Crates.io](https://img.shields.io/crates/v/fieldscope.svg)](https://crates.io/crates/fieldscope)
//! [![Documentation](https://docs.rs/fieldscope/badge.svg)](https://docs.rs/fieldscope)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/BinFlip/fieldscope/blob/main/LICENSE-APACHE)
//!
//! A declarative, lazily evaluated field tree for binary formats.
//!
//! A document is parsed into a tree of named fields, each with a bit address, a size, a decoded
//! value, a human readable display and a description. Formats describe their layout as
//! resumable grammars; the tree is only materialized as far as it is explored, so asking for the
//! first field of a multi gigabyte file reads a few bytes.
//!
//! ## Features
//!
//! - **📦 Efficient memory access** - Memory-mapped files, bit-addressed reads, shared sub-streams
//! - **🌲 Lazy field tree** - Children, values and displays are produced on first access
//! - **🛡️ Tolerant parsing** - Damaged data yields warnings and placeholder fields, not failures
//! - **🔤 TrueType/OpenType** - Table directory and eleven table grammars
//! - **📋 Metadata** - Title, author, version, dates and more from a parsed tree
//!
//! ## Quick Start
//!
//! Add `fieldscope` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! fieldscope = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! ```rust,no_run
//! use fieldscope::prelude::*;
//!
//! let parser = Parser::from_file("font.ttf".as_ref(), ParserConfig::default())?;
//! for table in parser.root().children().filter(|f| f.name().starts_with("table[")) {
//!     println!("{:>10} {}", table.address() / 8, table.display());
//! }
//! # Ok::<(), fieldscope::Error>(())
//! ```
//!
//! ### Navigating by path
//!
//! ```rust,no_run
//! use fieldscope::{Parser, ParserConfig};
//! use std::path::Path;
//!
//! let parser = Parser::from_file(Path::new("font.ttf"), ParserConfig::default())?;
//! parser.validate().map_err(fieldscope::Error::Validation)?;
//!
//! let units = parser.get_field("/table[0]/unit_per_em")?;
//! println!("{} = {}", units.path(), units.display());
//!
//! for (key, value) in parser.metadata().iter() {
//!     println!("{key}: {value}");
//! }
//! # Ok::<(), fieldscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`stream`] - Bit-addressed input streams over memory or mapped files
//! - [`field`] - The field tree, primitive types and the grammar engine
//! - [`parser`] - Documents, the format registry and format guessing
//! - [`formats`] - Format grammars
//! - [`metadata`] - Flat metadata extracted from a tree
//! - [`quality`] - Video quality estimation for media hosts
//! - [`diagnostics`] - Warnings collected while parsing
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! Lookups and the validation gate return [`Result`]. Problems found while decoding values or
//! running grammars never abort the parse; they are recorded in the parser's [`Diagnostics`]
//! and the affected field degrades to a placeholder.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use fieldscope::prelude::*;
///
/// let parser = Parser::from_file("font.ttf".as_ref(), ParserConfig::default())?;
/// let header: Field = parser.get_field("/table_hdr[0]")?;
/// println!("{}", header.description());
/// # Ok::<(), fieldscope::Error>(())
/// ```
pub mod prelude;

pub mod config;
pub mod diagnostics;
pub mod field;
pub mod formats;
pub mod metadata;
pub mod parser;
pub mod quality;
pub mod stream;

/// `fieldscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust,no_run
/// use fieldscope::{Parser, ParserConfig, Result};
///
/// fn open(path: &str) -> Result<Parser> {
///     Parser::from_file(std::path::Path::new(path), ParserConfig::default())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `fieldscope` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use fieldscope::{Error, Parser, ParserConfig};
///
/// match Parser::from_mem(vec![0; 16], ParserConfig::default()) {
///     Ok(parser) => println!("Parsed as {:?}", parser.format()),
///     Err(Error::NotSupported) => println!("Format not supported"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// Parsing options, see [`config::ParserConfig`].
pub use config::ParserConfig;

/// Warnings and errors collected while parsing.
pub use diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics};

/// The field tree: handles, values and primitive types.
pub use field::{Field, FieldId, FieldType, Value};

/// Documents and the format registry.
///
/// # Example
///
/// ```rust,no_run
/// use fieldscope::{FormatId, Parser, ParserConfig};
///
/// let parser = Parser::from_mem(std::fs::read("font.ttf")?, ParserConfig::default())?;
/// assert_eq!(parser.format(), Some(FormatId::TrueType));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub use parser::{Format, FormatId, FormatInfo, Parser};

/// Metadata extracted from a parsed tree.
pub use metadata::{Metadata, MetadataKey, MetadataValue};
