pub mod assemble;
pub mod blocks;
pub mod extract;
pub mod layout;
pub mod table;

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::db::VariableRow;
use crate::error::ParseError;
use crate::page::Page;
use blocks::BlockSelectors;
use extract::BlockFields;

/// Rows from one page plus the blocks that could not be read.
#[derive(Debug, Default)]
pub struct PageRows {
    pub page: u32,
    pub rows: Vec<VariableRow>,
    pub errors: Vec<ParseError>,
}

/// Page → blocks → classified fields → one row per block.
pub fn process_page(page: &Page, selectors: &BlockSelectors) -> PageRows {
    let blocks = blocks::extract_blocks(&page.document, selectors);

    let mut fields = Vec::with_capacity(blocks.len());
    let mut errors = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        match extract::extract_all(block) {
            Ok(f) => {
                debug!(page = page.index, block = i, id = %f.id, variant = ?f.variant, "Extracted block");
                fields.push(f);
            }
            Err(kind) => {
                let err = ParseError {
                    page: page.index,
                    block: i,
                    kind,
                };
                warn!("Skipping block: {}", err);
                errors.push(err);
            }
        }
    }
    debug!(
        page = page.index,
        blocks = blocks.len(),
        rows = fields.len(),
        "Processed page"
    );

    PageRows {
        page: page.index,
        rows: join_rows(page.index, fields),
        errors,
    }
}

fn join_rows(page: u32, fields: Vec<BlockFields>) -> Vec<VariableRow> {
    let texts: Vec<(String, String)> = fields
        .iter()
        .map(|f| (f.id.clone(), f.text.clone()))
        .collect();
    let rows = fields
        .into_iter()
        .map(|f| VariableRow {
            id: f.id,
            description: f.description,
            text: None,
            properties: f.properties,
            marginals: f.marginals,
        })
        .collect();
    join_text(page, rows, texts)
}

/// Left join of the question text onto identity + properties + marginals,
/// keyed by `id`. A row with no text entry keeps `text` as `None`; a text
/// entry with no row is dropped. A repeated `id` takes the first text seen
/// for it, so rows are never multiplied.
fn join_text(
    page: u32,
    mut rows: Vec<VariableRow>,
    texts: Vec<(String, String)>,
) -> Vec<VariableRow> {
    let mut by_id: HashMap<String, String> = HashMap::with_capacity(texts.len());
    for (id, text) in texts {
        match by_id.entry(id) {
            Entry::Occupied(e) => warn!(page, id = %e.key(), "Duplicate variable id on page"),
            Entry::Vacant(e) => {
                e.insert(text);
            }
        }
    }

    for row in &mut rows {
        row.text = by_id.get(&row.id).cloned();
    }
    rows
}

// ── Tests ──
