use std::path::Path;

use anyhow::Context;
use fieldscope::{Field, Parser, ParserConfig};
use serde::Serialize;

use crate::app::GlobalOptions;

/// Parser options selected by the global flags.
pub fn config(opts: &GlobalOptions) -> ParserConfig {
    if opts.lenient {
        ParserConfig::minimal()
    } else {
        ParserConfig::default()
    }
}

/// Open a file, guessing its format from the content and the extension.
pub fn load(path: &Path, opts: &GlobalOptions) -> anyhow::Result<Parser> {
    Parser::from_file(path, config(opts))
        .with_context(|| format!("failed to parse: {}", path.display()))
}

/// Resolve an absolute field path, defaulting to the root.
pub fn lookup<'a>(parser: &'a Parser, path: Option<&str>) -> anyhow::Result<Field<'a>> {
    match path {
        None | Some("/") => Ok(parser.root()),
        Some(path) => parser
            .get_field(path)
            .with_context(|| format!("no field at {path}")),
    }
}

/// Flat, serializable view of one field.
#[derive(Serialize)]
pub struct FieldOutput {
    pub name: String,
    pub path: String,
    pub address: u64,
    pub size: u64,
    #[serde(rename = "type")]
    pub type_name: String,
    pub is_field_set: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub display: String,
    pub description: String,
}

impl FieldOutput {
    pub fn new(field: Field<'_>) -> Self {
        let value = field.value();
        Self {
            name: field.name().to_string(),
            path: field.path(),
            address: field.absolute_address(),
            size: field.size(),
            type_name: field.type_name().to_string(),
            is_field_set: field.is_field_set(),
            value: value.has_value().then(|| value.to_string()),
            display: field.display().to_string(),
            description: field.description().to_string(),
        }
    }
}

/// Render a bit count as bytes when it is byte aligned.
pub fn format_bits(bits: u64) -> String {
    if bits % 8 == 0 {
        format!("{} bytes", bits / 8)
    } else {
        format!("{bits} bits")
    }
}
