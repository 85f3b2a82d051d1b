use crate::{
    field::{Field, FieldSetType, FieldType, Grammar, SetBuilder, Step, Value},
    Error, Result,
};

/// Items added per grammar step
const CHUNK: u64 = 256;

/// `count` consecutive items of one static-size type.
///
/// The size is known up front, so a vector is placed without reading any item. Items are named
/// `item[0]`, `item[1]`... unless another name is given, and the value of the vector is the list
/// of item values.
#[derive(Debug, Clone)]
pub struct GenericVector {
    count: u64,
    element: FieldType,
    item: &'static str,
    size: u64,
}

impl GenericVector {
    /// Create a vector of `count` items of `element`
    ///
    /// # Errors
    /// Returns [`Error::InvalidSize`] if `element` has no static size or the total size
    /// overflows.
    pub fn new(count: u64, element: FieldType) -> Result<Self> {
        let item_size = element.static_size().ok_or_else(|| {
            Error::InvalidSize(format!(
                "Vector items of type {} have no static size",
                element.type_name()
            ))
        })?;
        let size = count
            .checked_mul(item_size)
            .ok_or_else(|| Error::InvalidSize(format!("Vector of {count} items is too large")))?;

        Ok(GenericVector {
            count,
            element,
            item: "item[]",
            size,
        })
    }

    /// Use `name` for the items; it should end in `[]`
    #[must_use]
    pub fn with_item_name(mut self, name: &'static str) -> Self {
        self.item = name;
        self
    }

    /// Number of items
    pub fn count(&self) -> u64 {
        self.count
    }
}

struct VectorGrammar {
    remaining: u64,
    element: FieldType,
    item: &'static str,
}

impl Grammar for VectorGrammar {
    fn step(&mut self, set: &mut SetBuilder<'_>) -> Result<Step> {
        let batch = self.remaining.min(CHUNK);
        for _ in 0..batch {
            set.add(self.item, self.element.clone())?;
        }
        self.remaining -= batch;

        Ok(if self.remaining == 0 {
            Step::Done
        } else {
            Step::Continue
        })
    }
}

impl FieldSetType for GenericVector {
    fn create_fields(&self) -> Box<dyn Grammar> {
        Box::new(VectorGrammar {
            remaining: self.count,
            element: self.element.clone(),
            item: self.item,
        })
    }

    fn create_value(&self, set: Field<'_>) -> Result<Value> {
        Ok(Value::List(
            set.children().map(|item| item.value().clone()).collect(),
        ))
    }

    fn create_description(&self, _set: Field<'_>) -> Result<String> {
        Ok(format!(
            "Vector of {} {}",
            self.count,
            self.element.type_name()
        ))
    }

    fn static_size(&self) -> Option<u64> {
        Some(self.size)
    }

    fn type_name(&self) -> &'static str {
        "GenericVector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::parser_for;

    #[test]
    fn vector_items() {
        let parser = parser_for(&[0, 1, 0, 2, 0, 3, 9], |set| {
            set.add_vector("glyphs", 3, FieldType::UInt16)?;
            set.add("tail", FieldType::UInt8)?;
            Ok(())
        });

        let root = parser.root();
        let glyphs = root.get("glyphs").unwrap();
        assert_eq!(glyphs.size(), 48);
        assert_eq!(glyphs.current_len(), 0);
        assert_eq!(
            glyphs.value(),
            &Value::List(vec![Value::UInt(1), Value::UInt(2), Value::UInt(3)])
        );
        assert_eq!(glyphs.get("item[2]").unwrap().address(), 32);
        assert_eq!(root.get("tail").unwrap().address(), 48);
    }

    #[test]
    fn large_vectors_are_chunked() {
        let data = vec![0u8; 600];
        let parser = parser_for(&data, |set| {
            set.add_vector("bytes", 600, FieldType::UInt8)?;
            Ok(())
        });

        let vector = parser.root().get("bytes").unwrap();
        vector.get("item[10]").unwrap();
        assert_eq!(vector.current_len(), 256);
        assert_eq!(vector.len(), 600);
    }

    #[test]
    fn dynamic_elements_are_rejected() {
        let error = GenericVector::new(2, FieldType::PascalString8(crate::field::Charset::Ascii));
        assert!(matches!(error, Err(Error::InvalidSize(_))));
        assert!(matches!(
            GenericVector::new(u64::MAX, FieldType::UInt16),
            Err(Error::InvalidSize(_))
        ));
    }

    #[test]
    fn custom_item_names() {
        let parser = parser_for(&[1, 2], |set| {
            let vector = GenericVector::new(2, FieldType::UInt8)?.with_item_name("digit[]");
            set.add_set("digits", vector, None)?;
            Ok(())
        });

        assert!(parser.root().contains("digits/digit[1]"));
    }
}
