//! Document parsing.
//!
//! A [`Parser`] is the root of a field tree: it owns the stream, the arena of every field
//! produced so far and the diagnostics collected while producing them. Construction only creates
//! the root; the grammar runs as the tree is explored.
//!
//! # Key Components
//!
//! - [`Parser`] - Root field set of one document
//! - [`Format`] - Trait implemented by every supported format
//! - [`FormatInfo`] - Static description of a format
//! - [`FormatId`] - Registry of formats, with extension based lookup
//!
//! # Examples
//!
//! ```rust,no_run
//! use fieldscope::{FormatId, Parser, ParserConfig};
//! use fieldscope::stream::BitStream;
//!
//! let data = std::fs::read("font.ttf")?;
//! let stream = BitStream::from_mem(data)?;
//! let parser = Parser::new(stream, FormatId::TrueType, ParserConfig::default())?;
//!
//! let head = parser.get_field("/table[0]")?;
//! println!("{} ({})", head.display(), head.description());
//! if parser.diagnostics().has_warnings() {
//!     println!("{}", parser.diagnostics().summary());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod registry;

pub use registry::{Format, FormatId, FormatInfo};

use std::{fmt, path::Path, sync::Arc};

use crate::{
    config::ParserConfig,
    diagnostics::Diagnostics,
    field::{Field, FieldId, FieldSetType, Node},
    metadata::Metadata,
    stream::{BitStream, Endian},
    Error, Result,
};

/// Id of the root field in every parser
const ROOT: FieldId = 0;

/// Root of the field tree of one document.
///
/// The parser owns every field of the tree. Fields are created lazily and never removed, so a
/// [`Field`] handle stays valid for as long as the parser lives. A parser is `Send` but not
/// `Sync`: the tree grows through shared references, so it must be explored from one thread at
/// a time.
pub struct Parser {
    stream: BitStream,
    format: Option<FormatId>,
    endian: Endian,
    config: ParserConfig,
    diagnostics: Arc<Diagnostics>,
    nodes: boxcar::Vec<Node>,
}

impl Parser {
    /// Create the parser of `stream` as a document of `format`.
    ///
    /// When [`ParserConfig::validate`] is set the stream must be at least the minimum size of
    /// the format and pass its validation gate.
    ///
    /// # Arguments
    ///
    /// * `stream` - The document
    /// * `format` - The format to parse it as
    /// * `config` - Checks and display limits
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] with the reason if the gate rejects the stream.
    pub fn new(stream: BitStream, format: FormatId, config: ParserConfig) -> Result<Parser> {
        let implementation = format.format();
        let mut parser = Parser::with_root(
            stream,
            implementation.root(),
            implementation.endian(),
            config,
        );
        parser.format = Some(format);

        if config.validate {
            parser.validate().map_err(Error::Validation)?;
        }
        Ok(parser)
    }

    /// Create a parser with a root field set of the caller's choice.
    ///
    /// The document has no registered format: nothing is validated and no metadata is
    /// extracted, but the tree behaves exactly like that of a registered format.
    ///
    /// ```rust
    /// use fieldscope::{Parser, ParserConfig};
    /// use fieldscope::field::{sequence, FieldSetType, FieldType, Grammar};
    /// use fieldscope::stream::{BitStream, Endian};
    ///
    /// struct Pair;
    ///
    /// impl FieldSetType for Pair {
    ///     fn create_fields(&self) -> Box<dyn Grammar> {
    ///         sequence(|set| {
    ///             set.add("left", FieldType::UInt16)?;
    ///             set.add("right", FieldType::UInt16)?;
    ///             Ok(())
    ///         })
    ///     }
    /// }
    ///
    /// let stream = BitStream::from_mem(vec![0, 1, 2, 0]).unwrap();
    /// let parser = Parser::with_root(stream, Box::new(Pair), Endian::Little, ParserConfig::default());
    /// assert_eq!(parser.get_field("/left").unwrap().display(), "256");
    /// assert_eq!(parser.get_field("/right").unwrap().display(), "2");
    /// ```
    pub fn with_root(
        stream: BitStream,
        root: Box<dyn FieldSetType>,
        endian: Endian,
        config: ParserConfig,
    ) -> Parser {
        let nodes = boxcar::Vec::new();
        nodes.push(Node::set(
            "root".to_string(),
            None,
            0,
            root,
            Some(stream.len_bits()),
            None,
        ));

        Parser {
            stream,
            format: None,
            endian,
            config,
            diagnostics: Arc::new(Diagnostics::new()),
            nodes,
        }
    }

    /// Open `path` and guess its format.
    ///
    /// Formats registered for the file's extension are tried first, then all others; the first
    /// one accepting the stream wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileError`] if the file cannot be mapped, [`Error::Empty`] for an empty
    /// file and [`Error::NotSupported`] if no format accepts it.
    pub fn from_file(path: &Path, config: ParserConfig) -> Result<Parser> {
        let stream = BitStream::from_file(path)?;
        let extension = path.extension().and_then(|ext| ext.to_str());
        Self::guess(stream, extension, config)
    }

    /// Guess the format of an in-memory document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] for empty data and [`Error::NotSupported`] if no format
    /// accepts it.
    pub fn from_mem(data: Vec<u8>, config: ParserConfig) -> Result<Parser> {
        let stream = BitStream::from_mem(data)?;
        Self::guess(stream, None, config)
    }

    /// Try every candidate format on `stream`, those registered for `extension` first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if no format accepts the stream.
    pub fn guess(stream: BitStream, extension: Option<&str>, config: ParserConfig) -> Result<Parser> {
        for format in FormatId::candidates(extension) {
            match Parser::new(stream.clone(), format, config) {
                Ok(parser) => {
                    log::debug!("Stream parsed as {}", format.info().description);
                    return Ok(parser);
                }
                Err(Error::Validation(reason)) => {
                    log::debug!("Stream is not {}: {reason}", format.info().description);
                }
                Err(error) => return Err(error),
            }
        }
        Err(Error::NotSupported)
    }

    /// Run the validation gate of the format against this document.
    ///
    /// # Errors
    ///
    /// Returns the reason the document was rejected.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let Some(format) = self.format else {
            return Ok(());
        };

        let info = format.info();
        if self.stream.len_bits() < info.min_size {
            return Err(format!(
                "stream is smaller than {} bits ({} bits)",
                info.min_size,
                self.stream.len_bits()
            ));
        }
        format.format().validate(self.root())
    }

    /// The root field set
    pub fn root(&self) -> Field<'_> {
        Field::new(self, ROOT)
    }

    /// Resolve a path from the root, generating fields on demand
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if the path does not resolve.
    pub fn get_field(&self, path: &str) -> Result<Field<'_>> {
        self.root().get_field(path, false)
    }

    /// Warnings and errors collected while parsing
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    /// The configuration the parser was created with
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Format of the document; `None` for a parser built around a custom root
    pub fn format(&self) -> Option<FormatId> {
        self.format
    }

    /// Byte order of the format
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// The whole document
    pub fn stream(&self) -> &BitStream {
        &self.stream
    }

    /// Number of fields produced so far, the root included
    pub fn field_count(&self) -> usize {
        self.nodes.count()
    }

    /// Extract document metadata from the tree
    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::default();
        if let Some(format) = self.format {
            format
                .format()
                .extract_metadata(self.root(), &mut metadata);
        }
        metadata
    }

    pub(crate) fn node(&self, id: FieldId) -> &Node {
        &self.nodes[id]
    }

    pub(crate) fn push_node(&self, node: Node) -> FieldId {
        self.nodes.push(node)
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("format", &self.format)
            .field("stream", &self.stream)
            .field("fields", &self.nodes.count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::fonts::FontBuilder;

    #[test]
    fn root_and_paths() {
        let parser = Parser::from_mem(FontBuilder::minimal().build(), ParserConfig::default())
            .unwrap();
        let root = parser.root();
        assert!(root.is_root());
        assert_eq!(root.path(), "/");
        assert_eq!(root.size(), parser.stream().len_bits());
        assert_eq!(parser.format(), Some(FormatId::TrueType));
        assert_eq!(parser.endian(), Endian::Big);

        let nb_table = parser.get_field("/nb_table").unwrap();
        assert_eq!(nb_table.parent(), Some(root));
        assert_eq!(nb_table.index().unwrap(), 2);
        assert!(root.index().is_err());
        assert!(matches!(
            parser.get_field("/nope"),
            Err(Error::MissingField { ref container, ref key }) if container == "/" && key == "nope"
        ));
    }

    #[test]
    fn validation_gate() {
        let short = Parser::from_mem(vec![0, 1, 0, 0], ParserConfig::default());
        assert!(matches!(short, Err(Error::NotSupported)));

        let stream = BitStream::from_mem(vec![0, 1, 0, 0]).unwrap();
        let rejected = Parser::new(stream, FormatId::TrueType, ParserConfig::default());
        assert!(matches!(rejected, Err(Error::Validation(ref reason)) if reason.starts_with("stream is smaller than 80 bits")));

        let stream = BitStream::from_mem(vec![0; 4]).unwrap();
        assert!(Parser::new(stream, FormatId::TrueType, ParserConfig::minimal()).is_ok());

        assert!(matches!(
            Parser::from_mem(Vec::new(), ParserConfig::default()),
            Err(Error::Empty)
        ));
    }
}
