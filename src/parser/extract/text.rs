use crate::parser::blocks::Block;
use crate::parser::layout::{Field, Variant};

/// Stored for layouts that carry no question wording.
pub const NO_TEXT: &str = "None";

pub fn extract(block: &Block, variant: Variant) -> String {
    variant
        .table_for(Field::Text)
        .and_then(|i| block.tables.get(i))
        .map(|grid| clean(&grid.text))
        .unwrap_or_else(|| NO_TEXT.to_string())
}

fn clean(raw: &str) -> String {
    raw.replace(['\n', '\r'], "").trim().to_string()
}
