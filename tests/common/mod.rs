//! Shared helpers for integration tests.

#![allow(dead_code)]

#[path = "../../src/test/fonts.rs"]
pub mod fonts;

use fieldscope::{Field, Parser, ParserConfig};

/// Parse `font` as TrueType with the default configuration
pub fn parse(font: Vec<u8>) -> Parser {
    Parser::from_mem(font, ParserConfig::default()).unwrap()
}

/// Direct children of `set` whose name starts with `prefix`
pub fn children_named<'a>(set: Field<'a>, prefix: &str) -> Vec<Field<'a>> {
    set.children()
        .filter(|field| field.name().starts_with(prefix))
        .collect()
}

/// Check that the children of every field set in the tree are laid out in ascending order
pub fn assert_monotonic(set: Field<'_>) {
    let mut end = 0;
    for child in set.children() {
        assert!(
            end <= child.address(),
            "{} starts at {} before the end of its predecessor at {}",
            child.path(),
            child.address(),
            end
        );
        end = child.address() + child.size();
        if child.is_field_set() {
            assert_monotonic(child);
        }
    }
}
