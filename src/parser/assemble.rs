use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::{debug, warn};

use super::blocks::BlockSelectors;
use super::table::Datum;
use super::{process_page, PageRows};
use crate::db::VariableRow;
use crate::error::{FetchError, ParseError};
use crate::page::PageSource;

const CHUNK: usize = 200;

/// The final table plus everything that was left out of it.
#[derive(Debug, Default)]
pub struct Assembly {
    pub rows: Vec<VariableRow>,
    pub pages: usize,
    pub omitted: Vec<FetchError>,
    pub skipped: Vec<ParseError>,
}

/// Load and process every page in parallel, then concatenate rows in page
/// order. Pages that fail to load contribute nothing.
pub fn assemble<S: PageSource>(
    source: &S,
    indices: &[u32],
    selectors: &BlockSelectors,
    pb: &ProgressBar,
) -> Assembly {
    let mut results: Vec<(u32, Result<PageRows, FetchError>)> = Vec::with_capacity(indices.len());
    for chunk in indices.chunks(CHUNK) {
        let done: Vec<_> = chunk
            .par_iter()
            .map(|&index| {
                let rows = source.load(index).map(|page| process_page(&page, selectors));
                (index, rows)
            })
            .collect();
        results.extend(done);
        pb.inc(chunk.len() as u64);
    }

    let mut assembly = concat_pages(results);
    normalize_ids(&mut assembly.rows);
    assembly
}

/// Order-preserving reduction over per-page results, sorted by page index.
pub fn concat_pages(mut results: Vec<(u32, Result<PageRows, FetchError>)>) -> Assembly {
    results.sort_by_key(|(index, _)| *index);

    let mut assembly = Assembly::default();
    for (_, result) in results {
        match result {
            Ok(page) => {
                debug!(page = page.page, rows = page.rows.len(), "Appending page");
                assembly.pages += 1;
                assembly.rows.extend(page.rows);
                assembly.skipped.extend(page.errors);
            }
            Err(e) => {
                warn!("Omitting page: {}", e);
                assembly.omitted.push(e);
            }
        }
    }
    assembly
}

/// Final whole-table pass: lower-case every `id`, including the copies
/// broadcast into the nested tables.
pub fn normalize_ids(rows: &mut [VariableRow]) {
    let lower = |d: &Datum| match d {
        Datum::Text(s) => Datum::Text(s.to_lowercase()),
        other => other.clone(),
    };
    for row in rows {
        row.id = row.id.to_lowercase();
        row.marginals.map_column("id", lower);
        row.properties.map_column("id", lower);
    }
}
