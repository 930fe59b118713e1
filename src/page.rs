use std::collections::BTreeMap;

use scraper::Html;

use crate::error::FetchError;

/// One parsed codebook page. Not `Send`: load, parse and drop it on the
/// worker that processes it.
pub struct Page {
    pub index: u32,
    pub document: Html,
}

impl Page {
    pub fn parse(index: u32, markup: &str) -> Self {
        Page {
            index,
            document: Html::parse_document(markup),
        }
    }
}

/// Anything that can hand out pages by index: the page directory, or an
/// in-memory fixture.
pub trait PageSource: Sync {
    fn load(&self, index: u32) -> Result<Page, FetchError>;
}

impl PageSource for BTreeMap<u32, String> {
    fn load(&self, index: u32) -> Result<Page, FetchError> {
        self.get(&index)
            .map(|markup| Page::parse(index, markup))
            .ok_or_else(|| FetchError::Missing {
                page: index,
                path: format!("<memory>/{}", index).into(),
            })
    }
}
