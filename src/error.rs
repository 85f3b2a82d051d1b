use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Only a few of these ever reach a caller directly. [`Error::MissingField`] is returned by path
/// lookups and [`Error::Validation`] by the root format gate; everything raised while decoding a
/// value or while running a grammar is absorbed by the field tree, recorded in the
/// [`crate::Diagnostics`] of the parser and replaced by a sentinel result.
///
/// # Error Categories
///
/// ## Stream Errors
/// - [`Error::OutOfBounds`] - A read or a field placement exceeded the available bits
/// - [`Error::Empty`] - Empty input provided
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// ## Grammar Errors
/// - [`Error::Malformed`] - Data violating a structural rule of the format
/// - [`Error::InvalidSize`] - A field type whose size cannot be determined
///
/// ## Caller-visible Errors
/// - [`Error::MissingField`] - A path lookup did not resolve
/// - [`Error::Validation`] - The root format gate rejected the stream
/// - [`Error::NotSupported`] - No format accepted the stream
///
/// # Examples
///
/// ```rust,no_run
/// use fieldscope::{Error, Parser, ParserConfig};
/// use std::path::Path;
///
/// match Parser::from_file(Path::new("font.ttf"), ParserConfig::default()) {
///     Ok(parser) => match parser.get_field("/table[0]") {
///         Ok(table) => println!("{}", table.display()),
///         Err(Error::MissingField { container, key }) => {
///             eprintln!("{container} has no field {key}");
///         }
///         Err(e) => eprintln!("Other error: {e}"),
///     },
///     Err(Error::Validation(reason)) => eprintln!("Rejected: {reason}"),
///     Err(e) => eprintln!("Could not open: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The data is damaged and could not be parsed.
    ///
    /// Raised by grammars when a structural rule of the format is violated, such as a
    /// wrong magic value or an implausible record count. The error includes the source
    /// location where the malformation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted.
    ///
    /// Either a read addressed bits past the end of a stream window, or a field would
    /// have ended past the bound of its container.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// A path lookup did not resolve.
    ///
    /// Carries the path of the container the lookup stopped in and the segment that
    /// could not be found. This is the one error that routinely reaches callers, since
    /// "does this optional table exist" is a legitimate question.
    #[error("Field {key} not found in {container}")]
    MissingField {
        /// Path of the field set the lookup was performed in
        container: String,
        /// The path segment that could not be resolved
        key: String,
    },

    /// The root `validate()` gate rejected the stream.
    ///
    /// Nothing beyond the header may be trusted once this fires. The associated string
    /// holds the reason reported by the format.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The size of a field type could not be determined.
    ///
    /// Raised for example by a vector whose element type has no static size.
    #[error("Invalid size - {0}")]
    InvalidSize(String),

    /// This file type is not supported.
    ///
    /// No registered format accepted the provided stream.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur during file operations
    /// such as reading from disk, permission issues, or filesystem errors.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
