//! homebudget-finance: exchange rates, bill assembly, and message handling

pub mod assembler;
pub mod categories;
pub mod handler;
pub mod http;
pub mod rates;
pub mod receipts;
pub mod stage;
pub mod store;

pub use assembler::{AssembledBill, BillAssembler};
pub use categories::{CategoryMap, CategoryStore, resolve_category};
pub use handler::{Inbound, MessageHandler, Outcome, PORTAL_PREFIX};
pub use http::{HttpClient, HttpSettings};
pub use rates::{DirSnapshotStore, FeedKind, RateCache, RateFeed, RateSource, SnapshotStore};
pub use receipts::ReceiptFetcher;
pub use stage::{DONE_REPLY, Stage, StageError};
pub use store::{BillSink, FailedInputLog, JsonlBillStore, StoredBill, StoredItem};
