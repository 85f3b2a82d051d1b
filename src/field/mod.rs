//! The field tree.
//!
//! A parsed document is a tree of [`Field`]s. Every field has a name, a bit address relative to
//! its parent and a size; leaves decode a primitive [`FieldType`], field sets own an ordered list
//! of children produced by a [`Grammar`].
//!
//! # Architecture
//!
//! All nodes of one document live in an append-only arena owned by the [`crate::Parser`]. A
//! [`FieldId`] is an index into that arena and a [`Field`] is a cheap `Copy` handle pairing the
//! parser with an id. Parents are stored as ids, so the tree has no ownership cycles and is
//! dropped in one go with its parser.
//!
//! Everything that is expensive is lazy and computed at most once:
//!
//! - **Children** are produced by resumable grammars. Looking up a child that does not exist yet
//!   drives the grammar forward step by step until the child appears or the grammar is done.
//! - **Values, displays and descriptions** are memoized in write-once cells. A failing
//!   computation is reported to the diagnostics sink once and its sentinel result is cached.
//!
//! # Key Components
//!
//! - [`Field`] - Handle to one node of the tree
//! - [`FieldType`] - Primitive leaf types (integers, bits, padding, strings, enums...)
//! - [`FieldSetType`] / [`Grammar`] / [`SetBuilder`] - Composite field definitions
//! - [`GenericVector`] - `count` items of one static-size type
//! - [`Version16Dot16`], [`Fixed`], [`F2Dot14`], [`Tuple`] - Fixed-point composites
//! - [`Value`] - Decoded values
//!
//! # Paths
//!
//! Fields are addressed with `/`-separated paths. A leading `/` starts at the root, an empty
//! segment stays where it is, and a segment made of dots walks up one parent per dot after the
//! first, so `..` is the parent and `...` the grandparent.
//!
//! # Examples
//!
//! ```rust,no_run
//! use fieldscope::{Parser, ParserConfig};
//! use std::path::Path;
//!
//! let parser = Parser::from_file(Path::new("font.ttf"), ParserConfig::default())?;
//! let root = parser.root();
//! for field in root.children() {
//!     println!("{:>8} {} = {}", field.absolute_address() / 8, field.name(), field.display());
//! }
//!
//! let version = root.get("maj_ver")?;
//! assert_eq!(version.get_field("../nb_table", false)?.path(), "/nb_table");
//! # Ok::<(), fieldscope::Error>(())
//! ```

mod fixed;
mod offsets;
mod set;
mod text;
mod types;
mod value;
mod vector;

use std::{
    cell::OnceCell,
    fmt,
    sync::Arc,
};

use crate::{
    diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity},
    stream::BitStream,
    Error, Parser, Result,
};

pub use fixed::{F2Dot14, Fixed, Tuple, Version16Dot16};
pub use offsets::sort_by_offset;
pub use set::{sequence, FieldSetType, Grammar, SetBuilder, Step};
pub use text::{
    format_float, hexadecimal, human_filesize, printable_bytes, printable_text, Charset,
    TextHandler,
};
pub use types::FieldType;
pub use value::Value;
pub use vector::GenericVector;

pub(crate) use set::SetNode;

/// Index of a node in the arena of its parser
pub type FieldId = usize;

/// Storage of one node of the tree.
pub(crate) struct Node {
    pub(crate) name: String,
    pub(crate) parent: Option<FieldId>,
    pub(crate) address: u64,
    pub(crate) size: OnceCell<u64>,
    pub(crate) description: Option<String>,
    pub(crate) kind: NodeKind,
    value: OnceCell<Value>,
    display: OnceCell<String>,
    summary: OnceCell<String>,
}

pub(crate) enum NodeKind {
    Leaf(FieldType),
    Set(SetNode),
}

impl Node {
    pub(crate) fn leaf(
        name: String,
        parent: FieldId,
        address: u64,
        size: u64,
        ty: FieldType,
        description: Option<String>,
    ) -> Self {
        Node {
            name,
            parent: Some(parent),
            address,
            size: OnceCell::from(size),
            description,
            kind: NodeKind::Leaf(ty),
            value: OnceCell::new(),
            display: OnceCell::new(),
            summary: OnceCell::new(),
        }
    }

    pub(crate) fn set(
        name: String,
        parent: Option<FieldId>,
        address: u64,
        ty: Box<dyn FieldSetType>,
        declared: Option<u64>,
        description: Option<String>,
    ) -> Self {
        let size = OnceCell::new();
        if let Some(declared) = declared {
            let _ = size.set(declared);
        }

        Node {
            name,
            parent,
            address,
            size,
            description,
            kind: NodeKind::Set(SetNode::new(ty, declared)),
            value: OnceCell::new(),
            display: OnceCell::new(),
            summary: OnceCell::new(),
        }
    }

    pub(crate) fn as_set(&self) -> Option<&SetNode> {
        match &self.kind {
            NodeKind::Set(set) => Some(set),
            NodeKind::Leaf(_) => None,
        }
    }

    /// Size if already resolved, otherwise the extent produced so far
    pub(crate) fn known_size(&self) -> u64 {
        match (self.size.get(), &self.kind) {
            (Some(size), _) => *size,
            (None, NodeKind::Set(set)) => set.current_size(),
            (None, NodeKind::Leaf(_)) => 0,
        }
    }
}

/// Handle to one field of a parsed document.
///
/// Handles are `Copy` and borrow the [`crate::Parser`] that owns the tree. Two handles are equal
/// if and only if they refer to the same node of the same parser; there is no value-based
/// equality.
#[derive(Clone, Copy)]
pub struct Field<'a> {
    parser: &'a Parser,
    id: FieldId,
}

impl<'a> Field<'a> {
    pub(crate) fn new(parser: &'a Parser, id: FieldId) -> Self {
        Field { parser, id }
    }

    fn node(&self) -> &'a Node {
        self.parser.node(self.id)
    }

    /// The arena id of this field
    pub fn id(&self) -> FieldId {
        self.id
    }

    /// The parser owning this field
    pub fn parser(&self) -> &'a Parser {
        self.parser
    }

    /// Name of the field, unique among its siblings
    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    /// The containing field set, `None` for the root
    pub fn parent(&self) -> Option<Field<'a>> {
        self.node().parent.map(|id| Field::new(self.parser, id))
    }

    /// The root of the document
    pub fn root(&self) -> Field<'a> {
        self.parser.root()
    }

    /// Returns true for the root of the document
    pub fn is_root(&self) -> bool {
        self.node().parent.is_none()
    }

    /// Absolute path of the field; the root is `/`
    pub fn path(&self) -> String {
        let mut names = Vec::new();
        let mut current = Some(*self);
        while let Some(field) = current {
            if field.is_root() {
                break;
            }
            names.push(field.name());
            current = field.parent();
        }

        if names.is_empty() {
            return "/".to_string();
        }

        names.iter().rev().fold(String::new(), |mut path, name| {
            path.push('/');
            path.push_str(name);
            path
        })
    }

    /// Bit address relative to the parent
    pub fn address(&self) -> u64 {
        self.node().address
    }

    /// Bit address relative to the start of the stream
    pub fn absolute_address(&self) -> u64 {
        let mut address = 0;
        let mut current = Some(*self);
        while let Some(field) = current {
            address += field.address();
            current = field.parent();
        }
        address
    }

    /// Size in bits.
    ///
    /// For a field set without a declared size this drives its grammar to the end.
    pub fn size(&self) -> u64 {
        let node = self.node();
        if let Some(size) = node.size.get() {
            return *size;
        }
        self.parser.exhaust(self.id);
        node.known_size()
    }

    /// Returns true if the field is a field set
    pub fn is_field_set(&self) -> bool {
        matches!(self.node().kind, NodeKind::Set(_))
    }

    /// The primitive type of a leaf field
    pub fn field_type(&self) -> Option<&'a FieldType> {
        match &self.node().kind {
            NodeKind::Leaf(ty) => Some(ty),
            NodeKind::Set(_) => None,
        }
    }

    /// Short name of the field's type, such as `UInt16` or `TableHeader`
    pub fn type_name(&self) -> &'a str {
        match &self.node().kind {
            NodeKind::Leaf(ty) => ty.type_name(),
            NodeKind::Set(set) => set.ty.type_name(),
        }
    }

    /// The decoded value.
    ///
    /// Computed on first access and cached. A decoding failure is reported once and yields
    /// [`Value::Invalid`] from then on.
    pub fn value(&self) -> &'a Value {
        let node = self.node();
        if let Some(value) = node.value.get() {
            return value;
        }

        let computed = match &node.kind {
            NodeKind::Leaf(ty) => ty.decode(*self),
            NodeKind::Set(set) => set.ty.create_value(*self),
        };
        let value = computed.unwrap_or_else(|error| {
            self.warning(
                DiagnosticCategory::Decode,
                format!("Unable to create value: {error}"),
            );
            Value::Invalid
        });
        node.value.get_or_init(|| value)
    }

    /// Short human readable rendering of the value.
    ///
    /// Never fails; an error while rendering is reported and yields an empty string.
    pub fn display(&self) -> &'a str {
        let node = self.node();
        if let Some(display) = node.display.get() {
            return display;
        }

        let computed = match &node.kind {
            NodeKind::Leaf(ty) => ty.display(*self),
            NodeKind::Set(set) => set.ty.create_display(*self),
        };
        let display = computed.unwrap_or_else(|error| {
            self.warning(
                DiagnosticCategory::Decode,
                format!("Unable to create display: {error}"),
            );
            String::new()
        });
        node.display.get_or_init(|| display)
    }

    /// Longer description of the field.
    ///
    /// A description given by the grammar wins over the one computed by the type. Never fails;
    /// an error is reported and yields an empty string.
    pub fn description(&self) -> &'a str {
        let node = self.node();
        if let Some(description) = &node.description {
            return description;
        }
        if let Some(summary) = node.summary.get() {
            return summary;
        }

        let computed = match &node.kind {
            NodeKind::Leaf(_) => Ok(String::new()),
            NodeKind::Set(set) => set.ty.create_description(*self),
        };
        let summary = computed.unwrap_or_else(|error| {
            self.warning(
                DiagnosticCategory::Decode,
                format!("Unable to create description: {error}"),
            );
            String::new()
        });
        node.summary.get_or_init(|| summary)
    }

    /// Position of this field among its siblings.
    ///
    /// # Errors
    /// Returns [`crate::Error::MissingField`] for the root, which has no siblings.
    pub fn index(&self) -> Result<usize> {
        let missing = || Error::MissingField {
            container: self.parent().map_or_else(String::new, |parent| parent.path()),
            key: self.name().to_string(),
        };

        let parent = self.parent().ok_or_else(missing)?;
        let set = parent.node().as_set().ok_or_else(missing)?;
        set.position(self.id).ok_or_else(missing)
    }

    /// Lazily iterate over the children of a field set; empty for leaves
    pub fn children(&self) -> Children<'a> {
        Children {
            field: *self,
            next: 0,
        }
    }

    /// Number of children, driving the grammar to the end
    pub fn len(&self) -> usize {
        match self.node().as_set() {
            Some(set) => {
                self.parser.exhaust(self.id);
                set.child_count()
            }
            None => 0,
        }
    }

    /// Returns true if the field has no children
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of children produced so far, without driving the grammar
    pub fn current_len(&self) -> usize {
        self.node().as_set().map_or(0, SetNode::child_count)
    }

    /// Returns true once the grammar of a field set has finished
    pub fn is_exhausted(&self) -> bool {
        self.node().as_set().map_or(true, SetNode::is_exhausted)
    }

    fn child(&self, name: &str, constant: bool) -> Option<Field<'a>> {
        let set = self.node().as_set()?;
        loop {
            if let Some(id) = set.lookup(name) {
                return Some(Field::new(self.parser, id));
            }
            if constant || !self.parser.feed(self.id) {
                return set.lookup(name).map(|id| Field::new(self.parser, id));
            }
        }
    }

    fn walk(&self, segment: &str, constant: bool) -> Result<Field<'a>> {
        let missing = |container: &Field<'a>| Error::MissingField {
            container: container.path(),
            key: segment.to_string(),
        };

        if segment.is_empty() {
            return Ok(*self);
        }

        if segment.bytes().all(|byte| byte == b'.') {
            let mut current = *self;
            for _ in 1..segment.len() {
                current = current.parent().ok_or_else(|| missing(&current))?;
            }
            return Ok(current);
        }

        self.child(segment, constant).ok_or_else(|| missing(self))
    }

    /// Resolve a path relative to this field, or absolute if it starts with `/`.
    ///
    /// With `constant` set only fields that were already produced are searched. Otherwise the
    /// field sets along the path run their grammars as far as needed to find each segment.
    ///
    /// # Errors
    /// Returns [`crate::Error::MissingField`] naming the container and the segment that did
    /// not resolve.
    pub fn get_field(&self, key: &str, constant: bool) -> Result<Field<'a>> {
        let (mut current, rest) = match key.strip_prefix('/') {
            Some(rest) => (self.root(), rest),
            None => (*self, key),
        };

        for segment in rest.split('/') {
            current = current.walk(segment, constant)?;
        }
        Ok(current)
    }

    /// Resolve a path, generating fields on demand.
    ///
    /// # Errors
    /// Returns [`crate::Error::MissingField`] if the path does not resolve.
    pub fn get(&self, key: &str) -> Result<Field<'a>> {
        self.get_field(key, false)
    }

    /// Returns true if the path resolves, generating fields on demand
    pub fn contains(&self, key: &str) -> bool {
        self.get_field(key, false).is_ok()
    }

    /// Find the child whose bit range contains `address`, relative to this field set.
    ///
    /// With `feed` set the grammar is driven to the end first, otherwise only fields produced
    /// so far are considered.
    pub fn field_by_address(&self, address: u64, feed: bool) -> Option<Field<'a>> {
        let set = self.node().as_set()?;
        if feed {
            self.parser.exhaust(self.id);
        }

        let id = set.child_containing(self.parser, address)?;
        Some(Field::new(self.parser, id))
    }

    /// A stream window restricted to the bits of this field, addressed from 0.
    ///
    /// Field sets hand out a shared window and only keep a weak reference to it; once every
    /// holder has dropped it, the next call creates a fresh window over the same range.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the field lies outside of the stream.
    pub fn sub_stream(&self) -> Result<Arc<BitStream>> {
        let create = || -> Result<Arc<BitStream>> {
            Ok(Arc::new(
                self.parser
                    .stream()
                    .sub_stream(self.absolute_address(), self.size())?,
            ))
        };

        match self.node().as_set() {
            Some(set) => set.cached_stream(create),
            None => create(),
        }
    }

    /// The raw bytes covered by this field, a trailing partial byte left aligned
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the field lies outside of the stream.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        self.parser
            .stream()
            .read_raw(self.absolute_address(), self.size())
    }

    fn report(&self, severity: DiagnosticSeverity, category: DiagnosticCategory, message: String) {
        let path = self.path();
        match severity {
            DiagnosticSeverity::Info => log::info!("[{path}] {message}"),
            DiagnosticSeverity::Warning => log::warn!("[{path}] {message}"),
            DiagnosticSeverity::Error => log::error!("[{path}] {message}"),
        }

        let diagnostic = Diagnostic::new(severity, category, message)
            .with_path(path)
            .with_offset(self.absolute_address());
        self.parser.diagnostics().push(diagnostic);
    }

    /// Report an informational message attributed to this field
    pub fn info(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.report(DiagnosticSeverity::Info, category, message.into());
    }

    /// Report a warning attributed to this field
    pub fn warning(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.report(DiagnosticSeverity::Warning, category, message.into());
    }

    /// Report an error attributed to this field
    pub fn error(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.report(DiagnosticSeverity::Error, category, message.into());
    }
}

impl PartialEq for Field<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.parser, other.parser) && self.id == other.id
    }
}

impl Eq for Field<'_> {}

impl fmt::Debug for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("path", &self.path())
            .field("address", &self.address())
            .field("type", &self.type_name())
            .finish()
    }
}

/// Lazy iterator over the children of a field set.
///
/// Pulls further fields from the grammar only when the already produced ones are used up.
pub struct Children<'a> {
    field: Field<'a>,
    next: usize,
}

impl<'a> Iterator for Children<'a> {
    type Item = Field<'a>;

    fn next(&mut self) -> Option<Field<'a>> {
        let set = self.field.node().as_set()?;
        loop {
            if let Some(id) = set.child_at(self.next) {
                self.next += 1;
                return Some(Field::new(self.field.parser, id));
            }
            if !self.field.parser.feed(self.field.id) {
                let id = set.child_at(self.next)?;
                self.next += 1;
                return Some(Field::new(self.field.parser, id));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        stream::Endian,
        test::{parser_for, RecordSet},
    };

    fn nested() -> Parser {
        parser_for(&[1, 2, 3, 4, 5, 6], |set| {
            set.add("a", FieldType::UInt8)?;
            set.add_set("inner", RecordSet { count: 2 }, None)?;
            set.add("b", FieldType::UInt8)?;
            Ok(())
        })
    }

    #[test]
    fn absolute_and_relative_paths() {
        let parser = nested();
        let root = parser.root();
        assert_eq!(root.path(), "/");
        assert_eq!(root.name(), "root");

        let record = root.get("inner/record[1]").unwrap();
        assert_eq!(record.path(), "/inner/record[1]");
        assert_eq!(record.value(), &Value::UInt(0x0405));
        assert_eq!(record.address(), 16);
        assert_eq!(record.absolute_address(), 24);

        assert_eq!(record.get("../../a").unwrap().value(), &Value::UInt(1));
        assert_eq!(record.get("..").unwrap().name(), "inner");
        assert!(record.get("...").unwrap().is_root());
        assert_eq!(record.get(".").unwrap(), record);
        assert_eq!(record.get("/b").unwrap().value(), &Value::UInt(6));
        assert_eq!(record.get("//b").unwrap(), root.get("b").unwrap());
    }

    #[test]
    fn constant_lookups_do_not_feed() {
        let parser = nested();
        let root = parser.root();
        assert_eq!(root.current_len(), 0);
        assert!(matches!(
            root.get_field("a", true),
            Err(Error::MissingField { ref container, ref key }) if container == "/" && key == "a"
        ));

        root.get("a").unwrap();
        assert!(root.get_field("b", true).is_ok());
        let inner = root.get("inner").unwrap();
        assert!(inner.is_exhausted());
        assert!(inner.get_field("record[1]", true).is_ok());

        match root.get("inner/record[2]") {
            Err(Error::MissingField { container, key }) => {
                assert_eq!(container, "/inner");
                assert_eq!(key, "record[2]");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn identity_and_index() {
        let parser = nested();
        let root = parser.root();
        let record = root.get("inner/record[1]").unwrap();

        assert_eq!(record.index().unwrap(), 1);
        assert_eq!(root.get("b").unwrap().index().unwrap(), 2);
        assert!(root.index().is_err());
        assert_eq!(record.parent(), root.get("inner").ok());
        assert_ne!(record, root.get("inner/record[0]").unwrap());

        let other = nested();
        assert_ne!(other.get_field("/a").unwrap(), root.get("a").unwrap());
    }

    #[test]
    fn lookup_by_address() {
        let parser = nested();
        let root = parser.root();
        assert_eq!(root.field_by_address(24, false), None);
        assert_eq!(root.field_by_address(24, true).unwrap().name(), "inner");
        assert_eq!(root.field_by_address(40, true).unwrap().name(), "b");
        assert_eq!(root.field_by_address(48, true), None);

        let inner = root.get("inner").unwrap();
        assert_eq!(inner.field_by_address(31, true).unwrap().name(), "record[1]");
        assert_eq!(root.get("a").unwrap().field_by_address(0, true), None);
    }

    #[test]
    fn raw_content() {
        let parser = nested();
        let inner = parser.get_field("/inner").unwrap();
        assert_eq!(inner.size(), 32);
        assert_eq!(inner.bytes().unwrap(), [2, 3, 4, 5]);

        let window = inner.sub_stream().unwrap();
        assert_eq!(window.len_bits(), 32);
        assert_eq!(window.read_bits(16, 16, Endian::Big).unwrap(), 0x0405);
        assert!(Arc::ptr_eq(&window, &inner.sub_stream().unwrap()));
    }

    #[test]
    fn released_window_is_recreated() {
        let parser = nested();
        let inner = parser.get_field("/inner").unwrap();

        let window = inner.sub_stream().unwrap();
        let released = Arc::downgrade(&window);
        drop(window);
        assert!(released.upgrade().is_none());

        let fresh = inner.sub_stream().unwrap();
        assert_eq!(fresh.len_bits(), 32);
        assert_eq!(&*fresh.read_bytes(0, 4).unwrap(), &[2, 3, 4, 5]);
        assert!(Arc::ptr_eq(&fresh, &inner.sub_stream().unwrap()));
    }

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    impl FieldSetType for Counting {
        fn create_fields(&self) -> Box<dyn Grammar> {
            sequence(|set| {
                set.add("x", FieldType::UInt8)?;
                Ok(())
            })
        }

        fn create_value(&self, _set: Field<'_>) -> Result<Value> {
            if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
                return Err(malformed_error!("value computed twice"));
            }
            Ok(Value::UInt(7))
        }

        fn create_description(&self, _set: Field<'_>) -> Result<String> {
            Err(malformed_error!("no description"))
        }

        fn static_size(&self) -> Option<u64> {
            Some(8)
        }
    }

    #[test]
    fn memoized_results() {
        let calls = Arc::new(AtomicUsize::new(0));
        let shared = Arc::clone(&calls);
        let parser = parser_for(&[9], move |set| {
            set.add_set(
                "counted",
                Counting {
                    calls: Arc::clone(&shared),
                },
                None,
            )?;
            Ok(())
        });

        let counted = parser.get_field("/counted").unwrap();
        assert_eq!(counted.value(), &Value::UInt(7));
        assert_eq!(counted.value(), &Value::UInt(7));
        assert_eq!(counted.display(), "7");
        assert!(std::ptr::eq(counted.display(), counted.display()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(counted.description(), "");
        assert_eq!(counted.description(), "");
        assert_eq!(
            parser
                .diagnostics()
                .by_category(DiagnosticCategory::Decode)
                .len(),
            1
        );
    }
}
