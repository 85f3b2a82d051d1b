use std::path::PathBuf;

use fieldscope::quality::probe_all;
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::config,
    output::{print_output, Align, TabWriter},
};

#[derive(Serialize)]
struct QualityOutput {
    file: String,
    quality: String,
}

pub fn run(paths: &[PathBuf], opts: &GlobalOptions) -> anyhow::Result<()> {
    let output: Vec<QualityOutput> = probe_all(paths, config(opts))
        .into_iter()
        .map(|(path, quality)| QualityOutput {
            file: path.display().to_string(),
            quality: quality.to_string(),
        })
        .collect();

    print_output(&output, opts, |entries| {
        let mut table = TabWriter::new(&[("QUALITY", Align::Left), ("FILE", Align::Left)]);
        for entry in entries {
            table.row(vec![entry.quality.clone(), entry.file.clone()]);
        }
        table.print();
    })
}
