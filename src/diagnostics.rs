//! Diagnostics collection for field-tree parsing.
//!
//! Parsing untrusted input is lenient by design: an unknown enum value, a duplicated offset or a
//! corrupt subtable must not abort the extraction of unrelated, already parsed fields. Every such
//! anomaly is recorded here instead, attributed to the path and bit address of the nearest field,
//! and mirrored to the [`log`] facade.
//!
//! # Key Components
//!
//! - [`Diagnostics`] - Append-only container for diagnostic entries
//! - [`Diagnostic`] - Individual diagnostic entry with severity and context
//! - [`DiagnosticSeverity`] - Severity level (Info, Warning, Error)
//! - [`DiagnosticCategory`] - Category of the diagnostic source
//!
//! # Usage Examples
//!
//! ```rust
//! use fieldscope::diagnostics::{Diagnostics, DiagnosticCategory};
//!
//! let diagnostics = Diagnostics::new();
//! diagnostics.warning(DiagnosticCategory::Offset, "Skip table name (negative offset)");
//! diagnostics.error(DiagnosticCategory::Grammar, "Invalid magic of font header");
//!
//! assert_eq!(diagnostics.warning_count(), 1);
//! assert!(diagnostics.has_errors());
//!
//! for entry in diagnostics.by_category(DiagnosticCategory::Offset) {
//!     println!("{entry}");
//! }
//! ```
//!
//! # Thread Safety
//!
//! All types in this module are [`Send`] and [`Sync`]. The [`Diagnostics`] container uses
//! `boxcar::Vec` internally, which provides lock-free append operations, so a container can be
//! shared with other threads through an [`std::sync::Arc`] while a parse is still running.

use std::fmt::{self, Write};

/// Severity level of a diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticSeverity {
    /// Informational message, not indicating a problem.
    Info,

    /// Something about the data is off, but parsing continued.
    ///
    /// The affected field may hold a sentinel value or the tree may skip the data in question.
    Warning,

    /// A field or field set could not be parsed at all.
    Error,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Info => write!(f, "INFO"),
            DiagnosticSeverity::Warning => write!(f, "WARN"),
            DiagnosticSeverity::Error => write!(f, "ERROR"),
        }
    }
}

/// Category indicating the source or type of diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    /// Padding that was expected to be null holds data.
    Padding,

    /// Offsets pointing behind the cursor or outside of their container.
    Offset,

    /// Values missing from an enumeration lookup table.
    Enum,

    /// Issues with offset tables: duplicates, unknown tags, unparseable entries.
    Table,

    /// Record counts outside of plausible bounds.
    Count,

    /// Unknown character sets or text that does not decode in its declared charset.
    Charset,

    /// Stored checksums that do not match the data.
    Checksum,

    /// A field value, display or description could not be computed.
    Decode,

    /// A grammar stopped before producing all of its fields.
    Grammar,

    /// Issues found by format validation.
    Validation,

    /// General issues not fitting other categories.
    General,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::Padding => write!(f, "Padding"),
            DiagnosticCategory::Offset => write!(f, "Offset"),
            DiagnosticCategory::Enum => write!(f, "Enum"),
            DiagnosticCategory::Table => write!(f, "Table"),
            DiagnosticCategory::Count => write!(f, "Count"),
            DiagnosticCategory::Charset => write!(f, "Charset"),
            DiagnosticCategory::Checksum => write!(f, "Checksum"),
            DiagnosticCategory::Decode => write!(f, "Decode"),
            DiagnosticCategory::Grammar => write!(f, "Grammar"),
            DiagnosticCategory::Validation => write!(f, "Validation"),
            DiagnosticCategory::General => write!(f, "General"),
        }
    }
}

/// A single diagnostic entry with context information.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level of this diagnostic.
    pub severity: DiagnosticSeverity,

    /// Category indicating the source of this diagnostic.
    pub category: DiagnosticCategory,

    /// Human-readable description of the issue.
    pub message: String,

    /// Optional path of the field the issue is attributed to.
    pub path: Option<String>,

    /// Optional absolute bit address of that field.
    pub offset: Option<u64>,
}

impl Diagnostic {
    /// Creates a new diagnostic entry.
    ///
    /// # Arguments
    ///
    /// * `severity` - Severity level of the diagnostic
    /// * `category` - Category of the diagnostic source
    /// * `message` - Human-readable description
    pub fn new(
        severity: DiagnosticSeverity,
        category: DiagnosticCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            path: None,
            offset: None,
        }
    }

    /// Adds the path of the originating field.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Adds the absolute bit address of the originating field.
    #[must_use]
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: ", self.severity, self.category)?;

        if let Some(path) = &self.path {
            write!(f, "[{path}] ")?;
        }

        write!(f, "{}", self.message)?;

        if let Some(offset) = self.offset {
            write!(f, " (offset: 0x{:08x}.{})", offset / 8, offset % 8)?;
        }

        Ok(())
    }
}

/// Thread-safe container for collecting diagnostic entries.
///
/// Uses `boxcar::Vec` internally for lock-free append operations.
#[derive(Debug)]
pub struct Diagnostics {
    entries: boxcar::Vec<Diagnostic>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics {
    /// Creates a new empty diagnostics container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: boxcar::Vec::new(),
        }
    }

    /// Adds an informational diagnostic.
    pub fn info(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(DiagnosticSeverity::Info, category, message));
    }

    /// Adds a warning diagnostic.
    ///
    /// # Arguments
    ///
    /// * `category` - Category of the diagnostic
    /// * `message` - Description of the issue
    pub fn warning(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(
            DiagnosticSeverity::Warning,
            category,
            message,
        ));
    }

    /// Adds an error diagnostic.
    pub fn error(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(
            DiagnosticSeverity::Error,
            category,
            message,
        ));
    }

    /// Adds a diagnostic entry directly.
    ///
    /// Use this for diagnostics that carry a path or an offset.
    pub fn push(&self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Returns true if any diagnostics have been collected.
    pub fn has_any(&self) -> bool {
        self.entries.count() > 0
    }

    /// Returns true if any error-level diagnostics have been collected.
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, d)| d.severity == DiagnosticSeverity::Error)
    }

    /// Returns true if any warning-level diagnostics have been collected.
    pub fn has_warnings(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, d)| d.severity == DiagnosticSeverity::Warning)
    }

    /// Returns the total number of diagnostics.
    pub fn count(&self) -> usize {
        self.entries.count()
    }

    /// Returns the number of error-level diagnostics.
    pub fn error_count(&self) -> usize {
        self.count_severity(DiagnosticSeverity::Error)
    }

    /// Returns the number of warning-level diagnostics.
    pub fn warning_count(&self) -> usize {
        self.count_severity(DiagnosticSeverity::Warning)
    }

    /// Returns the number of info-level diagnostics.
    pub fn info_count(&self) -> usize {
        self.count_severity(DiagnosticSeverity::Info)
    }

    fn count_severity(&self, severity: DiagnosticSeverity) -> usize {
        self.entries
            .iter()
            .filter(|(_, d)| d.severity == severity)
            .count()
    }

    /// Returns an iterator over all diagnostics, in the order they were reported.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().map(|(_, d)| d)
    }

    /// Returns all errors as a vector.
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
            .collect()
    }

    /// Returns all warnings as a vector.
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
            .collect()
    }

    /// Returns diagnostics filtered by category.
    pub fn by_category(&self, category: DiagnosticCategory) -> Vec<&Diagnostic> {
        self.iter().filter(|d| d.category == category).collect()
    }

    /// Returns diagnostics attributed to the given field path.
    pub fn by_path(&self, path: &str) -> Vec<&Diagnostic> {
        self.iter()
            .filter(|d| d.path.as_deref() == Some(path))
            .collect()
    }

    /// Formats a summary of all diagnostics for display.
    pub fn summary(&self) -> String {
        let mut output = String::new();

        let error_count = self.error_count();
        let warning_count = self.warning_count();
        let info_count = self.info_count();

        let _ = writeln!(
            output,
            "Diagnostics: {} error(s), {} warning(s), {} info(s)",
            error_count, warning_count, info_count
        );

        if error_count > 0 {
            output.push_str("\nErrors:\n");
            for diag in self.errors() {
                let _ = writeln!(output, "  {diag}");
            }
        }

        if warning_count > 0 {
            output.push_str("\nWarnings:\n");
            for diag in self.warnings() {
                let _ = writeln!(output, "  {diag}");
            }
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_diagnostic_creation() {
        let diag = Diagnostic::new(
            DiagnosticSeverity::Warning,
            DiagnosticCategory::Padding,
            "Test message",
        );

        assert_eq!(diag.severity, DiagnosticSeverity::Warning);
        assert_eq!(diag.category, DiagnosticCategory::Padding);
        assert_eq!(diag.message, "Test message");
        assert!(diag.offset.is_none());
        assert!(diag.path.is_none());
    }

    #[test]
    fn test_diagnostic_with_context() {
        let diag = Diagnostic::new(
            DiagnosticSeverity::Error,
            DiagnosticCategory::Table,
            "Invalid entry",
        )
        .with_path("/table[2]")
        .with_offset(0x1000);

        assert_eq!(diag.offset, Some(0x1000));
        assert_eq!(diag.path.as_deref(), Some("/table[2]"));
    }

    #[test]
    fn test_diagnostics_container() {
        let diagnostics = Diagnostics::new();

        diagnostics.info(DiagnosticCategory::General, "Info message");
        diagnostics.warning(DiagnosticCategory::Offset, "Warning message");
        diagnostics.error(DiagnosticCategory::Grammar, "Error message");

        assert_eq!(diagnostics.count(), 3);
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(diagnostics.warning_count(), 1);
        assert_eq!(diagnostics.info_count(), 1);
        assert!(diagnostics.has_errors());
        assert!(diagnostics.has_warnings());
        assert!(diagnostics.has_any());
    }

    #[test]
    fn test_diagnostics_thread_safety() {
        let diagnostics = Arc::new(Diagnostics::new());
        let mut handles = vec![];

        for i in 0..10 {
            let diag_clone = Arc::clone(&diagnostics);
            handles.push(thread::spawn(move || {
                diag_clone.warning(DiagnosticCategory::General, format!("Thread {} warning", i));
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(diagnostics.count(), 10);
    }

    #[test]
    fn test_diagnostics_by_category_and_path() {
        let diagnostics = Diagnostics::new();

        diagnostics.push(
            Diagnostic::new(DiagnosticSeverity::Warning, DiagnosticCategory::Table, "a")
                .with_path("/table[0]"),
        );
        diagnostics.push(
            Diagnostic::new(DiagnosticSeverity::Warning, DiagnosticCategory::Table, "b")
                .with_path("/table[1]"),
        );
        diagnostics.warning(DiagnosticCategory::Padding, "c");

        assert_eq!(diagnostics.by_category(DiagnosticCategory::Table).len(), 2);
        assert_eq!(diagnostics.by_path("/table[1]").len(), 1);
        assert_eq!(diagnostics.by_path("/table[1]")[0].message, "b");
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new(
            DiagnosticSeverity::Warning,
            DiagnosticCategory::Padding,
            "Padding is not null",
        )
        .with_path("/padding[0]")
        .with_offset(0x1234 * 8 + 3);

        let display = format!("{}", diag);
        assert!(display.contains("WARN"));
        assert!(display.contains("Padding"));
        assert!(display.contains("[/padding[0]]"));
        assert!(display.contains("0x00001234.3"));
    }
}
