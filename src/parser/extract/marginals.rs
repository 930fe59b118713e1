use crate::error::BlockError;
use crate::parser::blocks::Block;
use crate::parser::layout::{Field, Variant};
use crate::parser::table::{
    drop_empty_columns, infer_column_types, normalize_column_names, rename_positional, Datum,
    Grid, NestedTable,
};

/// Response frequencies for one variable, with `id` broadcast onto every row.
pub fn extract(block: &Block, variant: Variant, id: &str) -> Result<NestedTable, BlockError> {
    let index = variant.offsets().marginals;
    let grid = block
        .tables
        .get(index)
        .ok_or_else(|| BlockError::malformed(Field::Marginals, index, "table is missing"))?;

    let mut table = reshape(grid);
    table.broadcast("id", Datum::Text(id.to_string()));
    Ok(table)
}

/// Two-column tables are case counts by range; anything wider is a
/// frequency table whose `value` column mixes codes and labels.
pub fn reshape(grid: &Grid) -> NestedTable {
    let grid = grid.promote_header();
    if grid.width() == 2 {
        return rename_positional(&grid, &["cases", "range"]);
    }

    let trimmed = drop_empty_columns(&grid);
    let names = normalize_column_names(&trimmed.column_names());
    let mut table = NestedTable::from_grid(&trimmed, names);
    infer_column_types(&mut table, &["value"]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::table::Cell;

    fn grid(rows: &[&[Option<&str>]]) -> Grid {
        Grid::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|c| c.map(str::to_string)).collect::<Vec<Cell>>())
                .collect(),
        )
    }

    fn text(s: &str) -> Datum {
        Datum::Text(s.to_string())
    }

    #[test]
    fn two_columns_become_cases_and_range() {
        let g = grid(&[&[Some("1,207"), Some("Male")], &[Some("1,393"), Some("Female")]]);
        let block = Block {
            tables: vec![Grid::default(), Grid::default(), g, Grid::default()],
        };
        let t = extract(&block, Variant::StandardForm, "sex").unwrap();
        assert_eq!(t.columns, vec!["cases", "range", "id"]);
        assert_eq!(t.rows[0], vec![text("1,207"), text("Male"), text("sex")]);
        assert_eq!(t.rows[1], vec![text("1,393"), text("Female"), text("sex")]);
    }

    #[test]
    fn wide_table_drops_empty_columns_and_normalizes_names() {
        let mut g = grid(&[
            &[Some("1"), Some("White"), Some(""), Some("2,100"), Some("80.8")],
            &[Some("2"), Some("Black"), None, Some("300"), Some("11.5")],
            &[Some("DK"), Some("Don't know"), Some(" "), Some("5"), None],
        ]);
        g.header = Some(vec![
            "Value".into(),
            "Label".into(),
            "".into(),
            "Cases".into(),
            "Valid %".into(),
        ]);
        let t = reshape(&g);
        assert_eq!(t.columns, vec!["value", "label", "cases", "valid_percent"]);
        // value stays text even where every entry looks numeric elsewhere
        assert_eq!(t.rows[0][0], text("1"));
        assert_eq!(t.rows[2][0], text("DK"));
        assert_eq!(t.rows[0][3], Datum::Number(80.8));
        assert_eq!(t.rows[2][3], Datum::Missing);
        assert_eq!(t.rows[0][2], text("2,100"));
    }

    #[test]
    fn numeric_value_column_is_still_text() {
        let mut g = grid(&[&[Some("1"), Some("a"), Some("3")], &[Some("2"), Some("b"), Some("4")]]);
        g.header = Some(vec!["Value".into(), "Label".into(), "N".into()]);
        let t = reshape(&g);
        assert!(t.column("value").unwrap().all(|d| matches!(d, Datum::Text(_))));
        assert!(t.column("n").unwrap().all(|d| matches!(d, Datum::Number(_))));
    }

    #[test]
    fn id_header_in_source_is_replaced_by_variable_id() {
        let mut g = grid(&[
            &[Some("ID"), Some("Value"), Some("Label")],
            &[Some("7"), Some("1"), Some("Male")],
            &[Some("8"), Some("2"), Some("Female")],
        ]);
        g.header_row = Some(0);
        let block = Block {
            tables: vec![Grid::default(), Grid::default(), g, Grid::default()],
        };
        let t = extract(&block, Variant::StandardForm, "SEX").unwrap();
        assert_eq!(t.columns, vec!["id", "value", "label"]);
        assert!(t.column("id").unwrap().all(|d| d == &text("SEX")));
    }

    #[test]
    fn id_broadcast_onto_every_row() {
        let g = grid(&[&[Some("1"), Some("x"), Some("2")], &[Some("3"), Some("y"), Some("4")]]);
        let block = Block {
            tables: vec![Grid::default(), g, Grid::default()],
        };
        let t = extract(&block, Variant::ShortForm, "race").unwrap();
        assert!(t.column("id").unwrap().all(|d| d == &text("race")));
    }
}
