//! The three in-memory stores, one per value kind.
//!
//! Kind uniqueness falls out of the layout: a key can only hold one kind
//! per store, and TYPE consults the stores in a fixed order instead of any
//! cross-kind lookup.

mod list_store;
mod stream_id;
mod stream_store;
mod string_store;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use list_store::{ListStore, ListWaiter};
pub use stream_id::{StreamId, StreamIdError};
pub use stream_store::{StreamEntry, StreamStore, StreamWaiter, entries_to_resp};
pub use string_store::{StringRecord, StringStore};

/// Cloneable handles to the process-wide store singletons. Each store sits
/// behind its own mutex so list traffic never contends with string or
/// stream traffic.
#[derive(Clone, Default)]
pub struct Stores {
    pub strings: Arc<Mutex<StringStore>>,
    pub lists: Arc<Mutex<ListStore>>,
    pub streams: Arc<Mutex<StreamStore>>,
}

impl Stores {
    pub fn new() -> Self {
        Stores::default()
    }
}
