//! `DSIG`: digital signature.

use crate::{
    diagnostics::DiagnosticCategory,
    field::{sequence, sort_by_offset, Field, FieldSetType, FieldType, Grammar},
    Result,
};

/// Format, length and offset of one signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureRecord;

impl FieldSetType for SignatureRecord {
    fn create_fields(&self) -> Box<dyn Grammar> {
        sequence(|set| {
            set.add_described("format", FieldType::UInt32, "Format of the signature")?;
            set.add_described("length", FieldType::UInt32, "Length of signature")?;
            set.add_described(
                "signatureBlockOffset",
                FieldType::UInt32,
                "Offset to signature block",
            )?;
            Ok(())
        })
    }

    fn static_size(&self) -> Option<u64> {
        Some(96)
    }

    fn type_name(&self) -> &'static str {
        "SignatureRecord"
    }
}

/// A PKCS#7 signature packet.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureBlock;

impl FieldSetType for SignatureBlock {
    fn create_fields(&self) -> Box<dyn Grammar> {
        sequence(|set| {
            set.add("reserved[]", FieldType::padding_bits(32))?;
            set.add_described(
                "length",
                FieldType::UInt32,
                "Length (in bytes) of the PKCS#7 packet in the signature field",
            )?;
            let length = set.uint("length")?;
            set.add_described("signature", FieldType::RawBytes(length), "Signature block")?;
            Ok(())
        })
    }

    fn create_description(&self, _set: Field<'_>) -> Result<String> {
        Ok("Signature block".to_string())
    }

    fn type_name(&self) -> &'static str {
        "SignatureBlock"
    }
}

pub(super) fn fields() -> Box<dyn Grammar> {
    sequence(|set| {
        set.add("version", FieldType::UInt32)?;
        set.add_described(
            "numSignatures",
            FieldType::UInt16,
            "Number of signatures in the table",
        )?;
        set.add("reserved[]", FieldType::padding_bits(15))?;
        set.add_described("flag", FieldType::Bit, "Cannot be resigned")?;

        let count = set.uint("numSignatures")?;
        let mut blocks = Vec::new();
        for _ in 0..count {
            let record = set.add_set("signatureRecords[]", SignatureRecord, None)?;
            let value = |name: &str| -> Result<u64> {
                record
                    .get(name)?
                    .value()
                    .as_u64()
                    .ok_or_else(|| malformed_error!("{} has no integer value", name))
            };
            blocks.push((value("signatureBlockOffset")?, value("length")?));
        }

        let (blocks, duplicates) = sort_by_offset(blocks, |block| block.0);
        for (offset, _) in duplicates {
            set.warning(
                DiagnosticCategory::Table,
                format!("Skip duplicate signature block at offset {offset}"),
            );
        }

        for (offset, length) in blocks {
            if offset.saturating_mul(8) < set.current_size() {
                set.warning(
                    DiagnosticCategory::Offset,
                    format!("Skip signature block at offset {offset} (overlaps previous data)"),
                );
                continue;
            }
            set.seek_byte(offset, true, false)?;
            set.add_set(
                "signatureBlock[]",
                SignatureBlock,
                Some(length.saturating_mul(8)),
            )?;
        }

        let remaining = set.remaining_bits() / 8;
        if remaining > 0 {
            set.add("padding_end", FieldType::null_bytes(remaining))?;
        }
        Ok(())
    })
}
