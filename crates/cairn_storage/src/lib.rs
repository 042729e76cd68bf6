//! # Cairn Storage
//!
//! Byte-store backend trait and implementations for Cairn.
//!
//! This crate provides the lowest-level storage abstraction for the
//! Cairn blob store. Backends are **opaque byte stores** - they do not
//! interpret the data they hold.
//!
//! ## Design Principles
//!
//! - Backends are simple byte stores (positional read, append, flush)
//! - No knowledge of the Cairn index format or record layout
//! - Must be `Send + Sync`; all methods take `&self` so one backend can
//!   be shared between caller threads and a background flush worker
//! - Cairn owns all format interpretation
//!
//! ## Available Backends
//!
//! - [`FileBackend`] - Persistent storage using OS file APIs
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//!
//! ## Example
//!
//! ```rust
//! use cairn_storage::{StorageBackend, InMemoryBackend};
//!
//! let backend = InMemoryBackend::new();
//! let offset = backend.append(b"hello world").unwrap();
//! let data = backend.read_at(offset, 11).unwrap();
//! assert_eq!(&data, b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
