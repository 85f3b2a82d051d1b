//! Field sets and the grammars that fill them.
//!
//! A field set is described by a [`FieldSetType`]. Its children come from a [`Grammar`], a
//! resumable producer that is stepped by the parser whenever somebody needs a child that does
//! not exist yet. Each step appends one or more fields through a [`SetBuilder`], which places
//! them at the current end of the set and checks them against the bounds of the set and its
//! ancestors.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    sync::{Arc, Weak},
};

use crate::{
    config::ParserConfig,
    diagnostics::DiagnosticCategory,
    field::{Field, FieldId, FieldType, GenericVector, Node, Value},
    stream::BitStream,
    Error, Parser, Result,
};

/// Outcome of one grammar step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More fields may follow
    Continue,
    /// The set is complete
    Done,
}

/// A resumable producer of fields.
///
/// The parser calls [`Grammar::step`] until it returns [`Step::Done`] or an error. A step should
/// add at least one field or finish, and may read the values of fields it added earlier through
/// the builder. An error ends the set: it is reported as a warning and the fields added so far
/// are kept.
pub trait Grammar: Send {
    /// Produce the next batch of fields
    ///
    /// # Errors
    /// Any error ends the set; see the trait documentation.
    fn step(&mut self, set: &mut SetBuilder<'_>) -> Result<Step>;
}

struct Sequence<F>(Option<F>);

impl<F> Grammar for Sequence<F>
where
    F: FnOnce(&mut SetBuilder<'_>) -> Result<()> + Send,
{
    fn step(&mut self, set: &mut SetBuilder<'_>) -> Result<Step> {
        if let Some(fields) = self.0.take() {
            fields(set)?;
        }
        Ok(Step::Done)
    }
}

/// A grammar producing all of its fields in a single step.
///
/// Suited for small fixed layouts where lazy generation gains nothing.
///
/// ```rust
/// use fieldscope::field::{sequence, FieldType, Grammar};
///
/// let grammar: Box<dyn Grammar> = sequence(|set| {
///     set.add("major", FieldType::UInt16)?;
///     set.add("minor", FieldType::UInt16)?;
///     Ok(())
/// });
/// # drop(grammar);
/// ```
pub fn sequence<F>(fields: F) -> Box<dyn Grammar>
where
    F: FnOnce(&mut SetBuilder<'_>) -> Result<()> + Send + 'static,
{
    Box::new(Sequence(Some(fields)))
}

/// Definition of a composite field.
///
/// Implementors provide the grammar producing the children and may override how the set is
/// summarized. Every method receives the set's own [`Field`] handle, so implementations can read
/// their children with [`Field::get`].
pub trait FieldSetType: Send {
    /// Create the grammar producing the children of `set`
    fn create_fields(&self) -> Box<dyn Grammar>;

    /// The value of the set as a whole
    ///
    /// # Errors
    /// Reported once; the value becomes [`Value::Invalid`].
    fn create_value(&self, _set: Field<'_>) -> Result<Value> {
        Ok(Value::None)
    }

    /// A longer description of the set
    ///
    /// # Errors
    /// Reported once; the description becomes empty.
    fn create_description(&self, _set: Field<'_>) -> Result<String> {
        Ok(String::new())
    }

    /// The short display of the set: the value if there is one, otherwise the description
    ///
    /// # Errors
    /// Reported once; the display becomes empty.
    fn create_display(&self, set: Field<'_>) -> Result<String> {
        let value = set.value();
        if value.has_value() {
            Ok(value.to_string())
        } else {
            Ok(set.description().to_string())
        }
    }

    /// The size in bits, when it is known without parsing
    fn static_size(&self) -> Option<u64> {
        None
    }

    /// Short type name shown by tree listings
    fn type_name(&self) -> &'static str {
        "FieldSet"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetState {
    Empty,
    Generating,
    Exhausted,
}

/// Children and grammar state of one field set.
pub(crate) struct SetNode {
    pub(crate) ty: Box<dyn FieldSetType>,
    pub(crate) declared: Option<u64>,
    grammar: RefCell<Option<Box<dyn Grammar>>>,
    state: Cell<SetState>,
    children: RefCell<Vec<FieldId>>,
    by_name: RefCell<HashMap<String, FieldId>>,
    counters: RefCell<HashMap<String, usize>>,
    current_size: Cell<u64>,
    stream: RefCell<Weak<BitStream>>,
}

/// A child name claimed by an add in progress; released if the add fails
struct Reservation {
    name: String,
    counter: Option<(String, usize)>,
}

impl SetNode {
    pub(crate) fn new(ty: Box<dyn FieldSetType>, declared: Option<u64>) -> Self {
        SetNode {
            ty,
            declared,
            grammar: RefCell::new(None),
            state: Cell::new(SetState::Empty),
            children: RefCell::new(Vec::new()),
            by_name: RefCell::new(HashMap::new()),
            counters: RefCell::new(HashMap::new()),
            current_size: Cell::new(0),
            stream: RefCell::new(Weak::new()),
        }
    }

    pub(crate) fn current_size(&self) -> u64 {
        self.current_size.get()
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.state.get() == SetState::Exhausted
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<FieldId> {
        self.by_name.borrow().get(name).copied()
    }

    pub(crate) fn child_at(&self, index: usize) -> Option<FieldId> {
        self.children.borrow().get(index).copied()
    }

    pub(crate) fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    pub(crate) fn position(&self, id: FieldId) -> Option<usize> {
        self.children.borrow().iter().position(|&child| child == id)
    }

    /// The child whose range contains `address`; children are sorted and never overlap
    pub(crate) fn child_containing(&self, parser: &Parser, address: u64) -> Option<FieldId> {
        let children = self.children.borrow();
        let index = children.partition_point(|&child| {
            let node = parser.node(child);
            node.address + node.known_size() <= address
        });

        let id = *children.get(index)?;
        (parser.node(id).address <= address).then_some(id)
    }

    pub(crate) fn cached_stream(
        &self,
        create: impl FnOnce() -> Result<Arc<BitStream>>,
    ) -> Result<Arc<BitStream>> {
        if let Some(stream) = self.stream.borrow().upgrade() {
            return Ok(stream);
        }

        let stream = create()?;
        *self.stream.borrow_mut() = Arc::downgrade(&stream);
        Ok(stream)
    }

    fn reserve(&self, owner: Field<'_>, name: &str) -> Reservation {
        let (base, automatic) = match name.strip_suffix("[]") {
            Some(base) => (base, true),
            None => (name, false),
        };

        let by_name = self.by_name.borrow();
        if !automatic {
            if !by_name.contains_key(name) {
                return Reservation {
                    name: name.to_string(),
                    counter: None,
                };
            }
            owner.warning(
                DiagnosticCategory::General,
                format!("Duplicate field name {name}, renaming it"),
            );
        }

        let mut counters = self.counters.borrow_mut();
        let counter = counters.entry(base.to_string()).or_insert(0);
        let previous = *counter;
        loop {
            let candidate = format!("{base}[{counter}]");
            *counter += 1;
            if !by_name.contains_key(&candidate) {
                return Reservation {
                    name: candidate,
                    counter: Some((base.to_string(), previous)),
                };
            }
        }
    }

    fn release(&self, reservation: Reservation) {
        if let Some((base, previous)) = reservation.counter {
            self.counters.borrow_mut().insert(base, previous);
        }
    }

    fn register(&self, id: FieldId, name: String, end: u64) {
        self.children.borrow_mut().push(id);
        self.by_name.borrow_mut().insert(name, id);
        self.current_size.set(end);
    }
}

impl Parser {
    /// Run one grammar step of field set `id`.
    ///
    /// Returns false once the set is complete, and also when the set is already being stepped
    /// further up the call stack; lookups from inside a grammar only see what exists so far.
    pub(crate) fn feed(&self, id: FieldId) -> bool {
        let Some(set) = self.node(id).as_set() else {
            return false;
        };
        let Ok(mut slot) = set.grammar.try_borrow_mut() else {
            return false;
        };

        match set.state.get() {
            SetState::Exhausted => return false,
            SetState::Empty => {
                *slot = Some(set.ty.create_fields());
                set.state.set(SetState::Generating);
            }
            SetState::Generating => {}
        }
        let Some(grammar) = slot.as_mut() else {
            return false;
        };

        let mut builder = SetBuilder { parser: self, id };
        match grammar.step(&mut builder) {
            Ok(Step::Continue) => return true,
            Ok(Step::Done) => {}
            Err(error) => builder.field().warning(
                DiagnosticCategory::Grammar,
                format!("Error during field set parsing: {error}"),
            ),
        }

        *slot = None;
        drop(slot);
        self.finish(id);
        false
    }

    /// Drive the grammar of `id` to the end
    pub(crate) fn exhaust(&self, id: FieldId) {
        while self.feed(id) {}
    }

    fn finish(&self, id: FieldId) {
        let node = self.node(id);
        let Some(set) = node.as_set() else {
            return;
        };

        if let Some(declared) = set.declared {
            let current = set.current_size();
            if current < declared && self.config().autofix {
                let missing = declared - current;
                let filler = if missing % 8 == 0 && current % 8 == 0 {
                    FieldType::RawBytes(missing / 8)
                } else {
                    FieldType::RawBits(missing)
                };

                let mut builder = SetBuilder { parser: self, id };
                match builder.add("raw[]", filler) {
                    Ok(raw) => raw.info(
                        DiagnosticCategory::General,
                        format!("Autofix: cover {missing} unparsed bits"),
                    ),
                    Err(error) => builder.field().warning(
                        DiagnosticCategory::Grammar,
                        format!("Unable to cover unparsed bits: {error}"),
                    ),
                }
            }
        }

        let _ = node.size.set(set.declared.unwrap_or(set.current_size()));
        set.state.set(SetState::Exhausted);
    }

    /// Number of bits available to the children of `id`
    fn limit(&self, id: FieldId) -> u64 {
        let node = self.node(id);
        if let Some(declared) = node.as_set().and_then(|set| set.declared) {
            return declared;
        }

        match node.parent {
            Some(parent) => self.limit(parent).saturating_sub(node.address),
            None => self.stream().len_bits(),
        }
    }

    fn check_bounds(&self, id: FieldId, address: u64, size: u64) -> Result<()> {
        match address.checked_add(size) {
            Some(end) if end <= self.limit(id) => Ok(()),
            _ => Err(Error::OutOfBounds),
        }
    }
}

/// Appends fields to the field set whose grammar is running.
///
/// New fields are placed at [`SetBuilder::current_size`], the end of the last field added. The
/// builder also gives the grammar read access to what it produced so far.
pub struct SetBuilder<'p> {
    parser: &'p Parser,
    id: FieldId,
}

impl<'p> SetBuilder<'p> {
    fn set(&self) -> Result<&'p SetNode> {
        self.parser
            .node(self.id)
            .as_set()
            .ok_or_else(|| Error::Error(format!("{} is not a field set", self.field().path())))
    }

    /// The field set being built
    pub fn field(&self) -> Field<'p> {
        Field::new(self.parser, self.id)
    }

    /// Configuration of the parser
    pub fn config(&self) -> &'p ParserConfig {
        self.parser.config()
    }

    /// Bits produced so far; the address of the next field
    pub fn current_size(&self) -> u64 {
        self.parser
            .node(self.id)
            .as_set()
            .map_or(0, SetNode::current_size)
    }

    /// The declared size of the set, if it has one
    pub fn size(&self) -> Option<u64> {
        self.parser.node(self.id).as_set().and_then(|set| set.declared)
    }

    /// Bits left until the declared size or the end of the enclosing space
    pub fn remaining_bits(&self) -> u64 {
        self.parser
            .limit(self.id)
            .saturating_sub(self.current_size())
    }

    /// Returns true if the declared size or the enclosing space is used up
    pub fn at_end(&self) -> bool {
        self.remaining_bits() == 0
    }

    /// Absolute bit address of the set
    pub fn absolute_address(&self) -> u64 {
        self.field().absolute_address()
    }

    /// Resolve a path relative to the set. Fields of the set itself are looked up as produced
    /// so far; nested sets are generated on demand.
    ///
    /// # Errors
    /// Returns [`Error::MissingField`] if the path does not resolve.
    pub fn get(&self, key: &str) -> Result<Field<'p>> {
        self.field().get_field(key, false)
    }

    /// Returns true if the set already has a field called `name`
    pub fn has(&self, name: &str) -> bool {
        self.parser
            .node(self.id)
            .as_set()
            .is_some_and(|set| set.lookup(name).is_some())
    }

    /// The value of the field at `key` as an unsigned integer
    ///
    /// # Errors
    /// Fails if the field is missing or has no integer value.
    pub fn uint(&self, key: &str) -> Result<u64> {
        self.get(key)?
            .value()
            .as_u64()
            .ok_or_else(|| malformed_error!("Field {} has no integer value", key))
    }

    /// The value of the field at `key` as a signed integer
    ///
    /// # Errors
    /// Fails if the field is missing or has no integer value.
    pub fn int(&self, key: &str) -> Result<i64> {
        self.get(key)?
            .value()
            .as_i64()
            .ok_or_else(|| malformed_error!("Field {} has no integer value", key))
    }

    /// The value of the field at `key` as a float
    ///
    /// # Errors
    /// Fails if the field is missing or has no numeric value.
    pub fn float(&self, key: &str) -> Result<f64> {
        self.get(key)?
            .value()
            .as_f64()
            .ok_or_else(|| malformed_error!("Field {} has no numeric value", key))
    }

    /// The value of the field at `key` as text
    ///
    /// # Errors
    /// Fails if the field is missing or is not a string.
    pub fn text(&self, key: &str) -> Result<String> {
        self.get(key)?
            .value()
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| malformed_error!("Field {} has no text value", key))
    }

    /// Read an integer at the current position without adding a field
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the bits lie outside the set or the stream.
    pub fn peek_uint(&self, nbits: u32) -> Result<u64> {
        self.peek_uint_at(self.current_size(), nbits)
    }

    /// Read an integer at bit `address` of the set without adding a field
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the bits lie outside the set or the stream.
    pub fn peek_uint_at(&self, address: u64, nbits: u32) -> Result<u64> {
        self.parser.check_bounds(self.id, address, u64::from(nbits))?;
        self.parser.stream().read_bits(
            self.absolute_address() + address,
            nbits,
            self.parser.endian(),
        )
    }

    /// Report a warning attributed to the set
    pub fn warning(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.field().warning(category, message);
    }

    fn measure(&self, ty: &FieldType, address: u64) -> Result<u64> {
        match ty.static_size() {
            Some(size) => Ok(size),
            None => ty.dynamic_size(self.parser, self.absolute_address() + address),
        }
    }

    fn push_leaf(
        &mut self,
        name: &str,
        ty: FieldType,
        description: Option<String>,
    ) -> Result<Field<'p>> {
        let parser = self.parser;
        let set = self.set()?;
        let address = set.current_size();
        let reservation = set.reserve(self.field(), name);

        let placed = self
            .measure(&ty, address)
            .and_then(|size| parser.check_bounds(self.id, address, size).map(|()| size));
        let size = match placed {
            Ok(size) => size,
            Err(error) => {
                set.release(reservation);
                return Err(error);
            }
        };

        let null_padding = matches!(ty, FieldType::Padding { null: true, .. });
        let id = parser.push_node(Node::leaf(
            reservation.name.clone(),
            self.id,
            address,
            size,
            ty,
            description,
        ));
        set.register(id, reservation.name, address + size);

        let field = Field::new(parser, id);
        if null_padding && parser.config().check_padding {
            match parser.stream().is_zero(field.absolute_address(), size) {
                Ok(true) => {}
                Ok(false) => field.warning(DiagnosticCategory::Padding, "Padding is not null"),
                Err(error) => field.warning(
                    DiagnosticCategory::Decode,
                    format!("Unable to check padding: {error}"),
                ),
            }
        }
        Ok(field)
    }

    fn push_set(
        &mut self,
        name: &str,
        ty: Box<dyn FieldSetType>,
        size: Option<u64>,
        description: Option<String>,
    ) -> Result<Field<'p>> {
        let parser = self.parser;
        let set = self.set()?;
        let address = set.current_size();
        let reservation = set.reserve(self.field(), name);

        let declared = size.or_else(|| ty.static_size());
        if let Some(declared) = declared {
            if let Err(error) = parser.check_bounds(self.id, address, declared) {
                set.release(reservation);
                return Err(error);
            }
        }

        let id = parser.push_node(Node::set(
            reservation.name.clone(),
            Some(self.id),
            address,
            ty,
            declared,
            description,
        ));

        if declared.is_none() {
            parser.exhaust(id);
            let size = parser.node(id).known_size();
            if let Err(error) = parser.check_bounds(self.id, address, size) {
                set.release(reservation);
                return Err(error);
            }
        }

        let size = parser.node(id).known_size();
        set.register(id, reservation.name, address + size);
        Ok(Field::new(parser, id))
    }

    /// Append a leaf field. A name ending in `[]` is numbered automatically: `item[]` becomes
    /// `item[0]`, `item[1]` and so on.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the field does not fit in the set, in which case
    /// nothing is added.
    pub fn add(&mut self, name: &str, ty: FieldType) -> Result<Field<'p>> {
        self.push_leaf(name, ty, None)
    }

    /// Append a leaf field with a fixed description
    ///
    /// # Errors
    /// See [`SetBuilder::add`].
    pub fn add_described(
        &mut self,
        name: &str,
        ty: FieldType,
        description: impl Into<String>,
    ) -> Result<Field<'p>> {
        self.push_leaf(name, ty, Some(description.into()))
    }

    /// Append a nested field set.
    ///
    /// With a `size` (or a static size of the type) the set is placed without parsing it and
    /// its grammar runs on demand later. Without one the nested grammar runs to the end right
    /// away to learn where the set ends.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the set does not fit.
    pub fn add_set<T>(&mut self, name: &str, ty: T, size: Option<u64>) -> Result<Field<'p>>
    where
        T: FieldSetType + 'static,
    {
        self.push_set(name, Box::new(ty), size, None)
    }

    /// Append a nested field set with a fixed description
    ///
    /// # Errors
    /// See [`SetBuilder::add_set`].
    pub fn add_set_described<T>(
        &mut self,
        name: &str,
        ty: T,
        size: Option<u64>,
        description: impl Into<String>,
    ) -> Result<Field<'p>>
    where
        T: FieldSetType + 'static,
    {
        self.push_set(name, Box::new(ty), size, Some(description.into()))
    }

    /// Append a [`GenericVector`] of `count` items of `element`
    ///
    /// # Errors
    /// Returns [`Error::InvalidSize`] if `element` has no static size, or
    /// [`Error::OutOfBounds`] if the vector does not fit.
    pub fn add_vector(&mut self, name: &str, count: u64, element: FieldType) -> Result<Field<'p>> {
        let vector = GenericVector::new(count, element)?;
        self.add_set(name, vector, None)
    }

    /// Move to bit `target`, relative to the start of the set.
    ///
    /// A forward gap is covered by one `padding[]` field, checked for zeros when `null` is set.
    /// Seeking to the current position adds nothing. Seeking backwards is impossible: it is
    /// reported as a warning and the position stays where it is.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the target lies past the end of the set.
    pub fn seek_bit(&mut self, target: u64, null: bool) -> Result<Option<Field<'p>>> {
        let current = self.current_size();
        match target.cmp(&current) {
            std::cmp::Ordering::Equal => Ok(None),
            std::cmp::Ordering::Less => {
                self.warning(
                    DiagnosticCategory::Offset,
                    format!("Unable to seek backward to bit {target}, already at bit {current}"),
                );
                Ok(None)
            }
            std::cmp::Ordering::Greater => {
                let padding = FieldType::Padding {
                    bits: target - current,
                    null,
                };
                self.add("padding[]", padding).map(Some)
            }
        }
    }

    /// Move to byte `target`, relative to the set or, without `relative`, to the stream.
    ///
    /// # Errors
    /// See [`SetBuilder::seek_bit`].
    pub fn seek_byte(
        &mut self,
        target: u64,
        relative: bool,
        null: bool,
    ) -> Result<Option<Field<'p>>> {
        let bits = target.checked_mul(8).ok_or(Error::OutOfBounds)?;
        let target = if relative {
            bits
        } else {
            match bits.checked_sub(self.absolute_address()) {
                Some(target) => target,
                None => {
                    self.warning(
                        DiagnosticCategory::Offset,
                        format!("Unable to seek to byte {target}, before the start of the set"),
                    );
                    return Ok(None);
                }
            }
        };
        self.seek_bit(target, null)
    }
}
