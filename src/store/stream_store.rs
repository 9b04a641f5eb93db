//! Append-only stream storage and the registry of blocked XREAD clients.
//!
//! Entries per stream are kept in insertion order, which is also ID order
//! because [`StreamStore::add`] enforces strict monotonicity. Blocked
//! clients live in one central waiter table (rather than per-stream lists)
//! since a single XREAD can watch several streams at once; removal from the
//! table is what settles the race between notification and timeout.

use std::collections::HashMap;

use jiff::Timestamp;
use tokio::sync::oneshot;

use crate::resp::RespValue;
use crate::store::stream_id::{StreamId, StreamIdError};

/// One stream entry. Field order is the order the client supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub id: StreamId,
    pub fields: Vec<(String, String)>,
}

impl StreamEntry {
    /// The wire shape of an entry: `[id, [field, value, ...]]`.
    pub fn to_resp(&self) -> RespValue {
        let mut flattened = Vec::with_capacity(self.fields.len() * 2);
        for (field, value) in &self.fields {
            flattened.push(RespValue::bulk_from_str(field));
            flattened.push(RespValue::bulk_from_str(value));
        }

        RespValue::Array(vec![
            RespValue::bulk_from_str(&self.id.to_string()),
            RespValue::Array(flattened),
        ])
    }
}

/// Encodes a batch of entries as the RESP array used by XRANGE and XREAD.
pub fn entries_to_resp(entries: &[StreamEntry]) -> RespValue {
    RespValue::Array(entries.iter().map(StreamEntry::to_resp).collect())
}

/// A client suspended in XREAD BLOCK. `watches` holds the last-seen ID per
/// stream; any entry past one of them satisfies the waiter. The notifier
/// only signals the oneshot — the woken connection task re-reads the
/// streams and composes its own reply.
#[derive(Debug)]
pub struct StreamWaiter {
    pub client_id: String,
    pub watches: Vec<(String, StreamId)>,
    pub sender: oneshot::Sender<()>,
}

#[derive(Debug, Default)]
pub struct StreamStore {
    streams: HashMap<String, Vec<StreamEntry>>,
    waiters: Vec<StreamWaiter>,
}

impl StreamStore {
    pub fn new() -> Self {
        StreamStore {
            streams: HashMap::new(),
            waiters: Vec::new(),
        }
    }

    /// Appends an entry. `id_spec` is `*`, `<ms>-*` or `<ms>-<seq>`; auto
    /// parts are filled in from the wall clock and the stream tail. The
    /// assigned ID must be strictly greater than the current last ID and
    /// must not be `0-0`.
    pub fn add(
        &mut self,
        key: &str,
        id_spec: &str,
        fields: Vec<(String, String)>,
    ) -> Result<StreamId, StreamIdError> {
        let id = self.resolve_id_spec(key, id_spec)?;

        if id == StreamId::MIN {
            return Err(StreamIdError::ZeroId);
        }

        if let Some(last) = self.last_id(key) {
            if id <= last {
                return Err(StreamIdError::NotGreaterThanLast);
            }
        }

        self.streams
            .entry(key.to_string())
            .or_default()
            .push(StreamEntry { id, fields });

        self.notify_waiters(key);

        Ok(id)
    }

    /// Entries with `start <= id <= end`, in ID order.
    pub fn range(&self, key: &str, start: StreamId, end: StreamId) -> Vec<StreamEntry> {
        let Some(entries) = self.streams.get(key) else {
            return Vec::new();
        };

        entries
            .iter()
            .filter(|entry| entry.id.in_range(start, end))
            .cloned()
            .collect()
    }

    /// Entries with `id` strictly greater than `after`. This is the XREAD
    /// read primitive.
    pub fn entries_after(&self, key: &str, after: StreamId) -> Vec<StreamEntry> {
        let Some(entries) = self.streams.get(key) else {
            return Vec::new();
        };

        entries
            .iter()
            .filter(|entry| entry.id > after)
            .cloned()
            .collect()
    }

    pub fn last_id(&self, key: &str) -> Option<StreamId> {
        self.streams
            .get(key)
            .and_then(|entries| entries.last())
            .map(|entry| entry.id)
    }

    pub fn first_id(&self, key: &str) -> Option<StreamId> {
        self.streams
            .get(key)
            .and_then(|entries| entries.first())
            .map(|entry| entry.id)
    }

    pub fn length(&self, key: &str) -> usize {
        self.streams.get(key).map_or(0, |entries| entries.len())
    }

    pub fn exists(&self, key: &str) -> bool {
        self.streams
            .get(key)
            .is_some_and(|entries| !entries.is_empty())
    }

    /// Registers a blocked XREAD client. Returns false without registering
    /// when one of the watched streams already has entries past its
    /// last-seen ID; the caller should read immediately instead.
    pub fn register_waiter(&mut self, waiter: StreamWaiter) -> bool {
        let already_satisfied = waiter
            .watches
            .iter()
            .any(|(key, last_seen)| self.has_entries_after(key, *last_seen));

        if already_satisfied {
            return false;
        }

        self.waiters.push(waiter);
        true
    }

    /// Removes a waiter from the table. A false return means a notifier
    /// already claimed it and a wake-up signal is (or shortly will be) on
    /// its channel.
    pub fn deregister_waiter(&mut self, client_id: &str) -> bool {
        let before = self.waiters.len();
        self.waiters.retain(|waiter| waiter.client_id != client_id);
        self.waiters.len() < before
    }

    /// Current wall time in milliseconds, used for `*` ID generation.
    fn now_ms(&self) -> u64 {
        Timestamp::now().as_millisecond().max(0) as u64
    }

    fn has_entries_after(&self, key: &str, after: StreamId) -> bool {
        self.last_id(key).is_some_and(|last| last > after)
    }

    /// Wakes every waiter watching `key` whose watch set is now satisfied.
    /// Satisfied waiters are removed from the table before their channel is
    /// signalled, so a concurrent timeout cannot also claim them.
    fn notify_waiters(&mut self, key: &str) {
        let waiters = std::mem::take(&mut self.waiters);

        for waiter in waiters {
            let watches_this_stream = waiter.watches.iter().any(|(k, _)| k == key);
            let satisfied = watches_this_stream
                && waiter
                    .watches
                    .iter()
                    .any(|(k, last_seen)| self.has_entries_after(k, *last_seen));

            if satisfied {
                let _ = waiter.sender.send(());
            } else {
                self.waiters.push(waiter);
            }
        }
    }

    fn resolve_id_spec(&self, key: &str, id_spec: &str) -> Result<StreamId, StreamIdError> {
        if id_spec == "*" {
            let ms = self.now_ms();
            let seq = StreamId::next_seq(ms, self.last_id(key));
            return Ok(StreamId::new(ms, seq));
        }

        let Some((ms_part, seq_part)) = id_spec.split_once('-') else {
            return Err(StreamIdError::Malformed);
        };

        let ms = ms_part
            .parse::<u64>()
            .map_err(|_| StreamIdError::Malformed)?;

        if seq_part == "*" {
            let seq = StreamId::next_seq(ms, self.last_id(key));
            return Ok(StreamId::new(ms, seq));
        }

        let seq = seq_part
            .parse::<u64>()
            .map_err(|_| StreamIdError::Malformed)?;

        Ok(StreamId::new(ms, seq))
    }
}
