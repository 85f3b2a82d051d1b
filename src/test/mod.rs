//! Shared test helpers.


use std::sync::Arc;

use crate::{
    config::ParserConfig,
    field::{sequence, FieldSetType, FieldType, Grammar, SetBuilder, Step},
    stream::{BitStream, Endian},
    Parser, Result,
};

struct ClosureRoot<F>(Arc<F>);

impl<F> FieldSetType for ClosureRoot<F>
where
    F: Fn(&mut SetBuilder<'_>) -> Result<()> + Send + Sync + 'static,
{
    fn create_fields(&self) -> Box<dyn Grammar> {
        let fields = Arc::clone(&self.0);
        sequence(move |set| fields(set))
    }
}

/// A big endian parser over `data` whose root runs `fields` in one step
pub(crate) fn parser_for<F>(data: &[u8], fields: F) -> Parser
where
    F: Fn(&mut SetBuilder<'_>) -> Result<()> + Send + Sync + 'static,
{
    let stream = BitStream::from_mem(data.to_vec()).unwrap();
    Parser::with_root(
        stream,
        Box::new(ClosureRoot(Arc::new(fields))),
        Endian::Big,
        ParserConfig::default(),
    )
}

/// `count` `record[]` UInt16 fields, one per grammar step
pub(crate) struct RecordSet {
    pub(crate) count: u64,
}

struct RecordGrammar {
    remaining: u64,
}

impl Grammar for RecordGrammar {
    fn step(&mut self, set: &mut SetBuilder<'_>) -> Result<Step> {
        if self.remaining == 0 {
            return Ok(Step::Done);
        }
        set.add("record[]", FieldType::UInt16)?;
        self.remaining -= 1;
        Ok(Step::Continue)
    }
}

impl FieldSetType for RecordSet {
    fn create_fields(&self) -> Box<dyn Grammar> {
        Box::new(RecordGrammar {
            remaining: self.count,
        })
    }
}
