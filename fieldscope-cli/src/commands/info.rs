use std::path::Path;

use fieldscope::Diagnostic;
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{format_bits, load},
    output::print_output,
};

#[derive(Serialize)]
struct DiagnosticOutput {
    severity: String,
    category: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

impl From<&Diagnostic> for DiagnosticOutput {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self {
            severity: diagnostic.severity.to_string(),
            category: diagnostic.category.to_string(),
            message: diagnostic.message.clone(),
            path: diagnostic.path.clone(),
        }
    }
}

#[derive(Serialize)]
struct InfoOutput {
    file: String,
    format: Option<String>,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    invalid_reason: Option<String>,
    size: u64,
    fields: usize,
    diagnostics: Vec<DiagnosticOutput>,
}

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let parser = load(path, opts)?;
    let validation = parser.validate();

    // Parsing stays lazy; touch the top level so directory warnings show up
    let root = parser.root();
    let size = root.size();
    let _ = root.len();

    let output = InfoOutput {
        file: path.display().to_string(),
        format: parser.format().map(|format| format.to_string()),
        valid: validation.is_ok(),
        invalid_reason: validation.err(),
        size,
        fields: parser.field_count(),
        diagnostics: parser.diagnostics().iter().map(Into::into).collect(),
    };

    print_output(&output, opts, |out| {
        println!("File:        {}", out.file);
        println!("Format:      {}", out.format.as_deref().unwrap_or("custom"));
        match &out.invalid_reason {
            None => println!("Valid:       yes"),
            Some(reason) => println!("Valid:       no ({reason})"),
        }
        println!("Size:        {}", format_bits(out.size));
        println!("Fields:      {}", out.fields);
        if !out.diagnostics.is_empty() {
            println!();
            print!("{}", parser.diagnostics().summary());
        }
    })?;

    if output.valid {
        Ok(())
    } else {
        anyhow::bail!("{} did not pass validation", path.display())
    }
}
