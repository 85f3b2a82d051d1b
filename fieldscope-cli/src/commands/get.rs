use std::path::Path;

use crate::{
    app::GlobalOptions,
    commands::common::{format_bits, load, lookup, FieldOutput},
    output::print_output,
};

pub fn run(path: &Path, field: &str, opts: &GlobalOptions) -> anyhow::Result<()> {
    let parser = load(path, opts)?;
    let field = lookup(&parser, Some(field))?;
    let output = FieldOutput::new(field);

    print_output(&output, opts, |out| {
        println!("Path:        {}", out.path);
        println!("Type:        {}", out.type_name);
        println!("Address:     {}", format_bits(out.address));
        println!("Size:        {}", format_bits(out.size));
        if let Some(value) = &out.value {
            println!("Value:       {value}");
        }
        println!("Display:     {}", out.display);
        if !out.description.is_empty() {
            println!("Description: {}", out.description);
        }
    })
}
