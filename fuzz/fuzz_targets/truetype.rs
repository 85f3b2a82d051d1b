#![no_main]

use fieldscope::{Field, FormatId, Parser, ParserConfig};
use fieldscope::stream::BitStream;
use libfuzzer_sys::fuzz_target;

fn visit(field: Field<'_>) {
    let _ = field.value();
    let _ = field.display();
    let _ = field.description();
    for child in field.children() {
        visit(child);
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(stream) = BitStream::from_mem(data.to_vec()) else {
        return;
    };
    let config = ParserConfig {
        validate: false,
        ..ParserConfig::strict()
    };
    if let Ok(parser) = Parser::new(stream, FormatId::TrueType, config) {
        visit(parser.root());
        let _ = parser.metadata();
    }
});
