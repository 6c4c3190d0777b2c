//! Adapters for the domain ports: storage backends and the processor client.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod usaepay;
