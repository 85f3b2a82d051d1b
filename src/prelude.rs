//! # fieldscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the fieldscope library. Import this module to get quick access to the essential
//! types for exploring a parsed document.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all fieldscope operations
pub use crate::Error;

/// The result type used throughout fieldscope
pub use crate::Result;

/// Parsing options and presets
pub use crate::ParserConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Root of a parsed document
pub use crate::Parser;

/// Format registry
pub use crate::parser::{Format, FormatId, FormatInfo};

/// Input streams
pub use crate::stream::{BitStream, Endian};

// ================================================================================================
// Field Tree
// ================================================================================================

/// Field handles and decoded values
pub use crate::field::{Field, FieldId, FieldType, Value};

/// Building blocks for grammars
pub use crate::field::{sequence, FieldSetType, GenericVector, Grammar, SetBuilder, Step};

// ================================================================================================
// Results of a Parse
// ================================================================================================

/// Collected warnings and errors
pub use crate::diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics};

/// Extracted metadata
pub use crate::metadata::{Metadata, MetadataKey, MetadataValue};

/// Quality estimation
pub use crate::quality::{probe_quality, Quality};
