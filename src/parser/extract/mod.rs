pub mod identity;
pub mod marginals;
pub mod properties;
pub mod text;

use super::blocks::Block;
use super::layout::{self, Variant};
use super::table::NestedTable;
use crate::error::BlockError;

/// The four fields pulled out of one block. `text` is computed on its own
/// and joined back by `id` during page assembly.
#[derive(Debug, Clone)]
pub struct BlockFields {
    pub variant: Variant,
    pub id: String,
    pub description: String,
    pub text: String,
    pub marginals: NestedTable,
    pub properties: NestedTable,
}

pub fn extract_all(block: &Block) -> Result<BlockFields, BlockError> {
    let variant = layout::classify(block.tables.len())?;
    let identity = identity::extract(block, variant)?;
    let marginals = marginals::extract(block, variant, &identity.id)?;
    let properties = properties::extract(block, variant, &identity.id)?;
    let text = text::extract(block, variant);

    Ok(BlockFields {
        variant,
        id: identity.id,
        description: identity.description,
        text,
        marginals,
        properties,
    })
}

// ── Tests ──
