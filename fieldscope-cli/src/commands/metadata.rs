use std::{collections::BTreeMap, path::Path};

use crate::{app::GlobalOptions, commands::common::load, output::print_output};

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let parser = load(path, opts)?;
    let metadata = parser.metadata();

    // Repeated keys (comments) keep every value
    let mut output: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in metadata.iter() {
        output.entry(key.to_string()).or_default().push(value.to_string());
    }

    print_output(&output, opts, |_| {
        if metadata.is_empty() {
            println!("No metadata");
        } else {
            print!("{metadata}");
        }
    })
}
