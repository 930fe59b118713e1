use std::fmt;

use crate::error::BlockError;

/// Positional layout of a variable block, recognized by its table count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Identifiers and recodes: no question wording.
    ShortForm,
    /// Ordinary survey questions.
    StandardForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Identity,
    Text,
    Marginals,
    Properties,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Identity => "identity",
            Field::Text => "question text",
            Field::Marginals => "marginals",
            Field::Properties => "properties",
        };
        f.write_str(name)
    }
}

/// Table offsets of one layout. `None` means the layout has no such table.
#[derive(Debug, Clone, Copy)]
pub struct Offsets {
    pub tables: usize,
    pub identity: usize,
    pub text: Option<usize>,
    pub marginals: usize,
    pub properties: usize,
}

// Adding a layout is a new entry here plus a Variant arm.
const SHORT_FORM: Offsets = Offsets {
    tables: 3,
    identity: 0,
    text: None,
    marginals: 1,
    properties: 2,
};

const STANDARD_FORM: Offsets = Offsets {
    tables: 4,
    identity: 0,
    text: Some(1),
    marginals: 2,
    properties: 3,
};

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::ShortForm, Variant::StandardForm];

    pub fn offsets(self) -> Offsets {
        match self {
            Variant::ShortForm => SHORT_FORM,
            Variant::StandardForm => STANDARD_FORM,
        }
    }

    /// Index of the table holding `field`, if this layout carries it.
    pub fn table_for(self, field: Field) -> Option<usize> {
        let o = self.offsets();
        match field {
            Field::Identity => Some(o.identity),
            Field::Text => o.text,
            Field::Marginals => Some(o.marginals),
            Field::Properties => Some(o.properties),
        }
    }
}

/// Decide a block's layout from its table count alone.
pub fn classify(table_count: usize) -> Result<Variant, BlockError> {
    Variant::ALL
        .into_iter()
        .find(|v| v.offsets().tables == table_count)
        .ok_or(BlockError::UnrecognizedVariant(table_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_tables_is_short_form() {
        assert_eq!(classify(3), Ok(Variant::ShortForm));
    }

    #[test]
    fn four_tables_is_standard_form() {
        assert_eq!(classify(4), Ok(Variant::StandardForm));
    }

    #[test]
    fn other_counts_are_rejected() {
        for n in [0, 1, 2, 5, 12] {
            assert_eq!(classify(n), Err(BlockError::UnrecognizedVariant(n)));
        }
    }

    #[test]
    fn offsets_match_layouts() {
        assert_eq!(Variant::ShortForm.table_for(Field::Text), None);
        assert_eq!(Variant::ShortForm.table_for(Field::Marginals), Some(1));
        assert_eq!(Variant::ShortForm.table_for(Field::Properties), Some(2));
        assert_eq!(Variant::StandardForm.table_for(Field::Text), Some(1));
        assert_eq!(Variant::StandardForm.table_for(Field::Marginals), Some(2));
        assert_eq!(Variant::StandardForm.table_for(Field::Properties), Some(3));
        for v in [Variant::ShortForm, Variant::StandardForm] {
            assert_eq!(v.table_for(Field::Identity), Some(0));
            let o = v.offsets();
            assert!(o.properties < o.tables && o.marginals < o.tables);
        }
    }
}
