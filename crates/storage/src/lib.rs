//! Storage leaf for SyncopateDB.
//!
//! This crate provides the only persistent medium the rest of the system
//! touches: the [`KvStore`] trait and its default [`ValueLogStore`]
//! implementation (spec §4.5), plus the typed [`codec`] the durability
//! layer uses to (de)serialize WAL entries and snapshots (spec §2).

#![warn(clippy::all)]

pub mod codec;
pub mod kv;
pub mod valuelog;

pub use codec::{codec_for, decode, encode, CompressedCodec, PlainCodec, StorageCodec};
pub use kv::KvStore;
pub use valuelog::ValueLogStore;
