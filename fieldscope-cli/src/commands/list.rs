use std::path::Path;

use crate::{
    app::GlobalOptions,
    commands::common::{load, lookup, FieldOutput},
    output::{print_output, Align, TabWriter},
};

pub fn run(path: &Path, field: Option<&str>, opts: &GlobalOptions) -> anyhow::Result<()> {
    let parser = load(path, opts)?;
    let set = lookup(&parser, field)?;
    if !set.is_field_set() {
        anyhow::bail!("{} is not a field set", set.path());
    }

    let output: Vec<FieldOutput> = set.children().map(FieldOutput::new).collect();

    print_output(&output, opts, |fields| {
        if fields.is_empty() {
            println!("{} has no fields", set.path());
            return;
        }
        let mut table = TabWriter::new(&[
            ("ADDRESS", Align::Right),
            ("SIZE", Align::Right),
            ("NAME", Align::Left),
            ("TYPE", Align::Left),
            ("DISPLAY", Align::Left),
        ]);
        for field in fields {
            let name = if field.is_field_set {
                format!("{}/", field.name)
            } else {
                field.name.clone()
            };
            table.row(vec![
                format!("{:#x}", field.address / 8),
                field.size.to_string(),
                name,
                field.type_name.clone(),
                field.display.clone(),
            ]);
        }
        table.print();
    })
}
