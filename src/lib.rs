//! A Redis-wire-compatible in-memory key/value server.
//!
//! This crate implements a server that speaks the Redis Serialization
//! Protocol (RESP) over TCP and supports:
//!
//! - String operations with millisecond expiry (GET, SET, INCR, KEYS)
//! - List operations including blocking reads (RPUSH, LPUSH, LPOP, BLPOP,
//!   LRANGE, LLEN)
//! - Append-only streams (XADD, XRANGE, XREAD with BLOCK)
//! - Per-connection transactions (MULTI, EXEC, DISCARD)
//! - Master-replica replication (REPLCONF, PSYNC, write propagation)
//! - Loading and saving the string subset of the RDB snapshot format
//!
//! Concurrency comes from Tokio: one task per client connection, with the
//! three data stores shared behind async mutexes.

pub mod commands;
pub mod connection;
pub mod input;
pub mod rdb;
pub mod resp;
pub mod server;
pub mod store;
