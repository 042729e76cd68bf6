//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level byte store for Cairn.
///
/// Storage backends are **opaque byte stores**. They provide positional
/// reads, offset-returning appends and flushing. Cairn owns all format
/// interpretation - backends do not understand the index or records.
///
/// # Invariants
///
/// - `append` returns the offset where data was written; concurrent
///   appends receive disjoint, consecutive ranges
/// - `read_at` returns exactly the bytes previously written at that
///   offset and never disturbs the append position
/// - `flush` pushes all appended data to the OS
///
/// All methods take `&self`; implementations provide their own interior
/// locking so a backend can be shared across threads.
///
/// # Implementors
///
/// - [`super::FileBackend`] - For persistent storage
/// - [`super::InMemoryBackend`] - For testing
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range extends beyond the current size or
    /// an I/O error occurs.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the storage.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&self, data: &[u8]) -> StorageResult<u64>;

    /// Flushes all pending writes to the OS.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&self) -> StorageResult<()>;

    /// Returns the current size of the storage in bytes.
    ///
    /// This is the offset where the next `append` will write.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// A stronger guarantee than `flush`: file metadata is durable too.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&self) -> StorageResult<()>;

    /// Truncates the storage to the given size.
    ///
    /// Used by the index codec to rewrite a whole snapshot from offset
    /// zero.
    ///
    /// # Errors
    ///
    /// Returns an error if `new_size` is greater than the current size
    /// or the truncation fails.
    fn truncate(&self, new_size: u64) -> StorageResult<()>;
}
