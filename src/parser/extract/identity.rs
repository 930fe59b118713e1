use crate::error::BlockError;
use crate::parser::blocks::Block;
use crate::parser::layout::{Field, Variant};
use crate::parser::table::is_blank;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub description: String,
}

/// Variable name from column 1 and label from column 3 of the first row.
/// Columns 2 and 4 are layout padding.
pub fn extract(block: &Block, variant: Variant) -> Result<Identity, BlockError> {
    let index = variant.offsets().identity;
    let malformed = |reason: &str| BlockError::malformed(Field::Identity, index, reason);

    let grid = block
        .tables
        .get(index)
        .ok_or_else(|| malformed("table is missing"))?;
    if grid.width() < 3 {
        return Err(malformed(&format!("expected at least 3 columns, found {}", grid.width())));
    }
    let id = grid.cell(0, 0);
    if is_blank(id) {
        return Err(malformed("variable name cell is empty"));
    }

    Ok(Identity {
        id: id.unwrap_or_default().trim().to_string(),
        description: grid.cell(0, 2).unwrap_or_default().trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::table::Grid;

    fn block_with(first: Vec<Option<&str>>) -> Block {
        let row = first.into_iter().map(|c| c.map(str::to_string)).collect();
        Block {
            tables: vec![Grid::from_rows(vec![row]), Grid::default(), Grid::default()],
        }
    }

    #[test]
    fn reads_columns_one_and_three() {
        let b = block_with(vec![Some("race"), Some(""), Some("Race of Respondent"), Some("")]);
        let id = extract(&b, Variant::ShortForm).unwrap();
        assert_eq!(id.id, "race");
        assert_eq!(id.description, "Race of Respondent");
    }

    #[test]
    fn three_columns_are_enough() {
        let b = block_with(vec![Some("AGE"), None, Some("Age of respondent")]);
        assert_eq!(extract(&b, Variant::ShortForm).unwrap().description, "Age of respondent");
    }

    #[test]
    fn fewer_than_three_columns_is_malformed() {
        let b = block_with(vec![Some("AGE"), Some("Age")]);
        let err = extract(&b, Variant::ShortForm).unwrap_err();
        assert!(matches!(err, BlockError::MalformedTable { field: Field::Identity, table: 0, .. }));
    }

    #[test]
    fn blank_name_is_malformed() {
        let b = block_with(vec![Some("  "), None, Some("Label")]);
        assert!(extract(&b, Variant::ShortForm).is_err());
    }
}
