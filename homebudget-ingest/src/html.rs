//! Locate the receipt text inside the portal's HTML page.

use homebudget_core::{HomebudgetError, Result};
use scraper::Html;

/// Depth-first search for the first text node starting with `banner`.
///
/// Leading whitespace of the node is ignored; the returned text starts at the
/// banner.
pub fn find_receipt_text(html: &str, banner: &str) -> Result<String> {
    let document = Html::parse_document(html);
    document
        .tree
        .root()
        .descendants()
        .filter_map(|node| node.value().as_text())
        .map(|text| text.trim_start())
        .find(|text| text.starts_with(banner))
        .map(str::to_string)
        .ok_or_else(|| HomebudgetError::Structure("fiscal receipt banner not found".to_string()))
}
