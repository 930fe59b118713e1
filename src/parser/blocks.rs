use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::table::{Cell, Grid};
use crate::error::SelectorError;

static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

/// One variable's region of a page: its data tables in document order.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub tables: Vec<Grid>,
}

/// Structural markers for the variable container and its data tables.
pub struct BlockSelectors {
    block: Selector,
    table: Selector,
}

impl BlockSelectors {
    pub fn new(block: &str, table: &str) -> Result<Self, SelectorError> {
        Ok(BlockSelectors {
            block: parse_selector(block)?,
            table: parse_selector(table)?,
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector, SelectorError> {
    Selector::parse(selector).map_err(|e| SelectorError {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Every variable block on the page, in document order. A page without
/// matching containers yields no blocks.
pub fn extract_blocks(document: &Html, selectors: &BlockSelectors) -> Vec<Block> {
    document
        .select(&selectors.block)
        .map(|container| Block {
            tables: container.select(&selectors.table).map(read_grid).collect(),
        })
        .collect()
}

fn read_grid(table: ElementRef) -> Grid {
    let rows: Vec<ElementRef> = table.select(&ROW_SEL).collect();

    let header_at = rows.iter().position(|r| in_thead(r)).or_else(|| {
        // an all-<th> first row only counts as a header when data follows it
        (rows.len() > 1 && is_header_row(&rows[0])).then_some(0)
    });

    let mut grid = Grid {
        text: table.text().collect(),
        ..Default::default()
    };
    for (i, row) in rows.iter().enumerate() {
        let cells = read_cells(row);
        if cells.is_empty() {
            continue;
        }
        if Some(i) == header_at {
            grid.header_row = Some(grid.rows.len());
        }
        grid.rows.push(cells);
    }
    grid
}

fn cell_elements<'a>(row: &ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| matches!(e.value().name(), "td" | "th"))
}

fn read_cells(row: &ElementRef) -> Vec<Cell> {
    cell_elements(row)
        .map(|c| Some(c.text().collect::<String>().trim().to_string()))
        .collect()
}

fn is_header_row(row: &ElementRef) -> bool {
    let mut cells = cell_elements(row).peekable();
    cells.peek().is_some() && cells.all(|c| c.value().name() == "th")
}

fn in_thead(row: &ElementRef) -> bool {
    row.parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|p| p.value().name() == "thead")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selectors() -> BlockSelectors {
        BlockSelectors::new("div.variable-container", "table.data-table").unwrap()
    }

    fn blocks(html: &str) -> Vec<Block> {
        extract_blocks(&Html::parse_document(html), &selectors())
    }

    #[test]
    fn tables_grouped_by_container() {
        let html = r#"
            <div class="variable-container">
              <table class="data-table"><tr><td>a</td></tr></table>
              <table class="data-table"><tr><td>b</td></tr></table>
            </div>
            <div class="variable-container">
              <table class="data-table"><tr><td>c</td></tr></table>
              <table class="layout"><tr><td>ignored</td></tr></table>
            </div>"#;
        let b = blocks(html);
        assert_eq!(b.len(), 2);
        assert_eq!(b[0].tables.len(), 2);
        assert_eq!(b[1].tables.len(), 1);
        assert_eq!(b[1].tables[0].cell(0, 0), Some("c"));
    }

    #[test]
    fn empty_page_has_no_blocks() {
        assert!(blocks("").is_empty());
        assert!(blocks("<html><body><p>nothing here</p></body></html>").is_empty());
    }

    #[test]
    fn header_from_thead() {
        let html = r#"<div class="variable-container"><table class="data-table">
            <thead><tr><th>Value</th><th>Label</th></tr></thead>
            <tbody><tr><td>1</td><td>Yes</td></tr></tbody>
        </table></div>"#;
        let g = &blocks(html)[0].tables[0];
        assert_eq!(g.header_row, Some(0));
        assert_eq!(g.rows.len(), 2);
        let p = g.promote_header();
        assert_eq!(p.header, Some(vec!["Value".to_string(), "Label".to_string()]));
        assert_eq!(p.rows.len(), 1);
    }

    #[test]
    fn lone_th_row_stays_data() {
        let html = r#"<div class="variable-container"><table class="data-table">
            <tr><th>SEX</th><th></th><th>Respondent's sex</th><th></th></tr>
        </table></div>"#;
        let g = &blocks(html)[0].tables[0];
        assert!(g.header_row.is_none());
        assert_eq!(g.cell(0, 0), Some("SEX"));
        assert_eq!(g.cell(0, 1), Some(""));
    }

    #[test]
    fn th_led_row_is_kept_as_first_row() {
        let html = r#"<div class="variable-container"><table class="data-table">
            <tr><th>SEX</th><th></th><th>Respondent's sex</th><th></th></tr>
            <tr><td>Module:</td><td></td><td>Core</td><td></td></tr>
        </table></div>"#;
        let g = &blocks(html)[0].tables[0];
        assert_eq!(g.header_row, Some(0));
        assert_eq!(g.rows.len(), 2);
        assert_eq!(g.cell(0, 0), Some("SEX"));
        assert_eq!(g.cell(0, 2), Some("Respondent's sex"));
        assert_eq!(g.cell(1, 0), Some("Module:"));
    }

    #[test]
    fn ragged_rows_keep_their_length() {
        let html = r#"<div class="variable-container"><table class="data-table">
            <tr><td>1</td><td>Male</td><td>45</td></tr>
            <tr><td>2</td></tr>
        </table></div>"#;
        let g = &blocks(html)[0].tables[0];
        assert_eq!(g.width(), 3);
        assert_eq!(g.rows[1].len(), 1);
        assert_eq!(g.cell(1, 2), None);
    }

    #[test]
    fn bad_selector_is_reported() {
        let err = BlockSelectors::new("div[", "table").err().unwrap();
        assert_eq!(err.selector, "div[");
    }
}
