//! Stream entry IDs and the pure helpers around them.
//!
//! A stream ID is a `(milliseconds, sequence)` pair rendered as
//! `"<ms>-<seq>"`. Within one stream IDs are strictly increasing and `0-0`
//! is never a valid entry ID.

use std::fmt;

use thiserror::Error;

/// Validation failures for XADD entry IDs. The message text is part of the
/// wire contract and is sent verbatim after the `ERR ` prefix.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum StreamIdError {
    #[error("Invalid stream ID specified as stream command argument")]
    Malformed,
    #[error("The ID specified in XADD must be greater than 0-0")]
    ZeroId,
    #[error("The ID specified in XADD is equal or smaller than the target stream top item")]
    NotGreaterThanLast,
}

/// A parsed stream ID. Ordering is lexicographic on `(ms, seq)`, which the
/// derived `Ord` provides given the field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const MIN: StreamId = StreamId { ms: 0, seq: 0 };
    pub const MAX: StreamId = StreamId {
        ms: u64::MAX,
        seq: u64::MAX,
    };

    pub fn new(ms: u64, seq: u64) -> Self {
        StreamId { ms, seq }
    }

    /// Parses a complete `"<ms>-<seq>"` ID. Anything else (missing hyphen,
    /// extra components, non-numeric parts) is rejected.
    pub fn parse(input: &str) -> Option<StreamId> {
        let (ms_part, seq_part) = input.split_once('-')?;
        let ms = ms_part.parse::<u64>().ok()?;
        let seq = seq_part.parse::<u64>().ok()?;
        Some(StreamId { ms, seq })
    }

    /// Parses the start bound of a range query. `-` means the smallest
    /// possible ID and a bare `<ms>` defaults the sequence to 0.
    pub fn parse_start_bound(input: &str) -> Option<StreamId> {
        if input == "-" {
            return Some(StreamId::MIN);
        }
        Self::parse_bound(input)
    }

    /// Parses the end bound of a range query. `+` means the largest
    /// possible ID and a bare `<ms>` defaults the sequence to 0, mirroring
    /// the start bound.
    pub fn parse_end_bound(input: &str) -> Option<StreamId> {
        if input == "+" {
            return Some(StreamId::MAX);
        }
        Self::parse_bound(input)
    }

    fn parse_bound(input: &str) -> Option<StreamId> {
        if input.contains('-') {
            Self::parse(input)
        } else {
            let ms = input.parse::<u64>().ok()?;
            Some(StreamId { ms, seq: 0 })
        }
    }

    /// Inclusive range membership on both ends.
    pub fn in_range(&self, start: StreamId, end: StreamId) -> bool {
        *self >= start && *self <= end
    }

    /// Picks the sequence number for an auto-generated ID at `ms`.
    ///
    /// Because IDs are strictly increasing, the only entries that can share
    /// `ms` are at the tail of the stream, so the last ID is enough:
    /// same `ms` continues the run, a fresh `ms` starts at 0, and an empty
    /// stream starts at 0 except for the reserved `0-0`.
    pub fn next_seq(ms: u64, last_id: Option<StreamId>) -> u64 {
        match last_id {
            Some(last) if last.ms == ms => last.seq + 1,
            Some(_) => 0,
            None if ms == 0 => 1,
            None => 0,
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}
