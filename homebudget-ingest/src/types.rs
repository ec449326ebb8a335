/// Line prefixes and formats of the Serbian fiscal receipt template.
///
/// Everything the receipt parser keys on lives here, so a template change on the
/// portal side is a change to this struct only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLabels {
    /// First characters of the text node holding the receipt
    pub banner: String,
    /// Items table header ("Name")
    pub items_header: String,
    /// Line closing the items table
    pub separator: String,
    /// "Total amount:"
    pub total: String,
    /// "PFR time:"
    pub timestamp: String,
    /// chrono format of the value after `timestamp`
    pub timestamp_format: String,
}

impl Default for ReceiptLabels {
    fn default() -> Self {
        Self {
            banner: "============ ФИСКАЛНИ РАЧУН".to_string(),
            items_header: "Назив".to_string(),
            separator: "--------".to_string(),
            total: "Укупан износ:".to_string(),
            timestamp: "ПФР време:".to_string(),
            timestamp_format: "%d.%m.%Y. %H:%M:%S".to_string(),
        }
    }
}

/// Receipts come from grocery fiscal devices.
pub const RECEIPT_DESCRIPTION: &str = "Supermarket";
pub const RECEIPT_CATEGORY: &str = "Groceries";
