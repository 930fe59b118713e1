use crate::error::BlockError;
use crate::parser::blocks::Block;
use crate::parser::layout::{Field, Variant};
use crate::parser::table::{rename_positional, Datum, NestedTable};

pub fn extract(block: &Block, variant: Variant, id: &str) -> Result<NestedTable, BlockError> {
    let index = variant.offsets().properties;
    let grid = block
        .tables
        .get(index)
        .ok_or_else(|| BlockError::malformed(Field::Properties, index, "table is missing"))?;
    if grid.width() != 2 {
        return Err(BlockError::malformed(
            Field::Properties,
            index,
            format!("expected 2 columns, found {}", grid.width()),
        ));
    }

    let mut table = rename_positional(grid, &["property", "value"]);
    table.map_column("property", |d| match d {
        Datum::Text(s) => Datum::Text(strip_colon(s)),
        other => other.clone(),
    });
    table.broadcast("id", Datum::Text(id.to_string()));
    Ok(table)
}

fn strip_colon(name: &str) -> String {
    name.trim_end().trim_end_matches(':').trim_end().to_string()
}
