//! Fixed-point composites.
//!
//! Each is a small field set whose value reduces its integer children to one float.

use crate::{
    field::{sequence, Field, FieldSetType, FieldType, Grammar, Value},
    Result,
};

fn child_float(set: Field<'_>, name: &str) -> Result<f64> {
    set.get(name)?
        .value()
        .as_f64()
        .ok_or_else(|| malformed_error!("{} has no numeric value", name))
}

/// A `major.minor` version with the minor part written in hexadecimal, so 0x0001_5000 is 1.5
#[derive(Debug, Clone, Copy, Default)]
pub struct Version16Dot16;

impl FieldSetType for Version16Dot16 {
    fn create_fields(&self) -> Box<dyn Grammar> {
        sequence(|set| {
            set.add("major", FieldType::UInt16)?;
            set.add("minor", FieldType::UInt16)?;
            Ok(())
        })
    }

    fn create_value(&self, set: Field<'_>) -> Result<Value> {
        let major = set.get("major")?.value().as_u64().unwrap_or_default();
        let minor = set.get("minor")?.value().as_u64().unwrap_or_default();
        format!("{major}.{minor:x}")
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|error| malformed_error!("Invalid version {}.{:x}: {}", major, minor, error))
    }

    fn static_size(&self) -> Option<u64> {
        Some(32)
    }

    fn type_name(&self) -> &'static str {
        "Version16Dot16"
    }
}

/// 16.16 signed fixed point: `int_part + frac_part / 65536`
#[derive(Debug, Clone, Copy, Default)]
pub struct Fixed;

impl FieldSetType for Fixed {
    fn create_fields(&self) -> Box<dyn Grammar> {
        sequence(|set| {
            set.add("int_part", FieldType::Int16)?;
            set.add("float_part", FieldType::UInt16)?;
            Ok(())
        })
    }

    fn create_value(&self, set: Field<'_>) -> Result<Value> {
        let int_part = child_float(set, "int_part")?;
        let float_part = child_float(set, "float_part")?;
        Ok(Value::Float(int_part + float_part / 65536.0))
    }

    fn static_size(&self) -> Option<u64> {
        Some(32)
    }

    fn type_name(&self) -> &'static str {
        "Fixed"
    }
}

/// 2.14 signed fixed point stored as one 16-bit integer
#[derive(Debug, Clone, Copy, Default)]
pub struct F2Dot14;

impl FieldSetType for F2Dot14 {
    fn create_fields(&self) -> Box<dyn Grammar> {
        sequence(|set| {
            set.add("int_part", FieldType::Int16)?;
            Ok(())
        })
    }

    fn create_value(&self, set: Field<'_>) -> Result<Value> {
        Ok(Value::Float(child_float(set, "int_part")? / 16384.0))
    }

    fn static_size(&self) -> Option<u64> {
        Some(16)
    }

    fn type_name(&self) -> &'static str {
        "F2Dot14"
    }
}

/// One [`Fixed`] coordinate per variation axis
#[derive(Debug, Clone, Copy)]
pub struct Tuple {
    /// Number of coordinates
    pub axis_count: u64,
}

impl FieldSetType for Tuple {
    fn create_fields(&self) -> Box<dyn Grammar> {
        let axis_count = self.axis_count;
        sequence(move |set| {
            for _ in 0..axis_count {
                set.add_set("coordinate[]", Fixed, None)?;
            }
            Ok(())
        })
    }

    fn create_description(&self, _set: Field<'_>) -> Result<String> {
        Ok("Tuple Record".to_string())
    }

    fn static_size(&self) -> Option<u64> {
        self.axis_count.checked_mul(32)
    }

    fn type_name(&self) -> &'static str {
        "Tuple"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::parser_for;

    fn float(set: Field<'_>) -> f64 {
        set.value().as_f64().unwrap()
    }

    #[test]
    fn version() {
        let parser = parser_for(&[0x00, 0x01, 0x50, 0x00, 0x00, 0x02, 0x00, 0x00], |set| {
            set.add_set("a", Version16Dot16, None)?;
            set.add_set("b", Version16Dot16, None)?;
            Ok(())
        });

        let root = parser.root();
        assert_eq!(float(root.get("a").unwrap()), 1.5);
        assert_eq!(float(root.get("b").unwrap()), 2.0);
        assert_eq!(root.get("b").unwrap().display(), "2.0");
        assert_eq!(root.get("a/minor").unwrap().value(), &Value::UInt(0x5000));
    }

    #[test]
    fn fixed() {
        let parser = parser_for(
            &[
                0x00, 0x01, 0x80, 0x00, // 1.5
                0xFF, 0xF4, 0x00, 0x00, // -12.0
                0x00, 0x00, 0xFF, 0xFF, // 65535 / 65536
                0x00, 0x03, 0x00, 0x00, // 3.0
            ],
            |set| {
                for _ in 0..4 {
                    set.add_set("fixed[]", Fixed, None)?;
                }
                Ok(())
            },
        );

        let root = parser.root();
        assert_eq!(float(root.get("fixed[0]").unwrap()), 1.5);
        assert_eq!(float(root.get("fixed[1]").unwrap()), -12.0);
        assert_eq!(float(root.get("fixed[2]").unwrap()), 65535.0 / 65536.0);
        assert_eq!(float(root.get("fixed[3]").unwrap()), 3.0);
    }

    #[test]
    fn f2dot14() {
        let parser = parser_for(&[0x40, 0x00, 0xC0, 0x00, 0x70, 0x00, 0x00, 0x01], |set| {
            for _ in 0..4 {
                set.add_set("value[]", F2Dot14, None)?;
            }
            Ok(())
        });

        let root = parser.root();
        assert_eq!(float(root.get("value[0]").unwrap()), 1.0);
        assert_eq!(float(root.get("value[1]").unwrap()), -1.0);
        assert_eq!(float(root.get("value[2]").unwrap()), 1.75);
        assert_eq!(float(root.get("value[3]").unwrap()), 1.0 / 16384.0);
    }

    #[test]
    fn tuple() {
        let parser = parser_for(&[0x00, 0x01, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00], |set| {
            set.add_set("coordinates", Tuple { axis_count: 2 }, None)?;
            Ok(())
        });

        let tuple = parser.root().get("coordinates").unwrap();
        assert_eq!(tuple.size(), 64);
        assert_eq!(tuple.description(), "Tuple Record");
        assert_eq!(float(tuple.get("coordinate[1]").unwrap()), -1.0);
    }
}
