//! Index data model and codec.
//!
//! The index is the only structured metadata in a Cairn store: the data
//! file is a flat concatenation of transformed payloads, and every
//! record's location and transform flags live here. The index is loaded
//! once at open time and persisted as a whole snapshot on every flush -
//! there are no incremental index updates.

use crate::error::{CairnError, CairnResult};
use cairn_storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Byte range of a record's payload within the data file.
///
/// Ranges of a valid index are non-overlapping and, sorted by
/// `stream_start`, contiguous from offset zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataReference {
    /// Byte offset of the payload in the data file.
    pub stream_start: u64,
    /// Length of the payload in bytes.
    pub length: u64,
}

/// Transform flags recorded per record at write time.
///
/// Immutable once written; drives the reverse-transform order on read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProperties {
    /// The stored payload is deflate-compressed.
    pub is_compressed: bool,
    /// The stored payload is AES-encrypted (with its IV prefix).
    pub is_encrypted: bool,
}

/// One entry of the index: where a blob lives and how it was
/// transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Location of the payload in the data file.
    pub data_reference: DataReference,
    /// Transform flags of the payload.
    pub properties: DataProperties,
}

impl IndexRecord {
    /// Creates a record from a location and transform flags.
    #[must_use]
    pub fn new(data_reference: DataReference, properties: DataProperties) -> Self {
        Self {
            data_reference,
            properties,
        }
    }
}

/// The persisted mapping from key to [`IndexRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// All committed records, keyed by the caller-supplied key.
    pub records: BTreeMap<String, IndexRecord>,
}

impl Index {
    /// Verifies that the records form a contiguous run from offset zero.
    ///
    /// Walking the records sorted by `stream_start`, each record must
    /// begin exactly where the previous one ended.
    ///
    /// # Errors
    ///
    /// Returns [`CairnError::IndexCorrupted`] naming the offending key
    /// and the expected vs. actual offset.
    pub fn check_contiguous(&self) -> CairnResult<()> {
        let mut records: Vec<(&String, &IndexRecord)> = self.records.iter().collect();
        // Zero-length records share their start offset with the record
        // that follows them; sorting by length too keeps them ahead of
        // it so they don't break the walk.
        records.sort_by_key(|(_, record)| {
            (record.data_reference.stream_start, record.data_reference.length)
        });

        let mut expected = 0u64;
        for (key, record) in records {
            let start = record.data_reference.stream_start;
            if start != expected {
                return Err(CairnError::index_corrupted(format!(
                    "record {key:?} expected to start at offset {expected}, but starts at {start}"
                )));
            }
            expected = start + record.data_reference.length;
        }

        Ok(())
    }

    /// Returns the data-file length this index describes: the sum of
    /// all record lengths.
    #[must_use]
    pub fn expected_data_len(&self) -> u64 {
        self.records
            .values()
            .map(|record| record.data_reference.length)
            .sum()
    }
}

/// Whole-snapshot index persistence over a storage backend.
///
/// `save` always rewrites the entire file from offset zero and flushes;
/// `load` treats an empty file as an empty index and never fails on
/// one.
pub(crate) struct IndexFile {
    backend: Box<dyn StorageBackend>,
}

impl IndexFile {
    pub(crate) fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Loads the persisted index snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CairnError::IndexCorrupted`] if existing content does
    /// not parse.
    pub(crate) fn load(&self) -> CairnResult<Index> {
        let len = self.backend.size()?;
        if len == 0 {
            return Ok(Index::default());
        }

        let bytes = self.backend.read_at(0, len as usize)?;
        serde_json::from_slice(&bytes)
            .map_err(|err| CairnError::index_corrupted(format!("malformed index file: {err}")))
    }

    /// Rewrites the whole index snapshot and flushes it to the OS.
    pub(crate) fn save(&self, index: &Index) -> CairnResult<()> {
        let bytes = serde_json::to_vec(index)?;

        self.backend.truncate(0)?;
        self.backend.append(&bytes)?;
        self.backend.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_storage::InMemoryBackend;

    fn record(start: u64, length: u64) -> IndexRecord {
        IndexRecord::new(
            DataReference {
                stream_start: start,
                length,
            },
            DataProperties::default(),
        )
    }

    #[test]
    fn empty_file_loads_empty_index() {
        let file = IndexFile::new(Box::new(InMemoryBackend::new()));
        let index = file.load().unwrap();
        assert!(index.records.is_empty());
    }

    #[test]
    fn snapshot_round_trip() {
        let file = IndexFile::new(Box::new(InMemoryBackend::new()));

        let mut index = Index::default();
        index.records.insert("a".to_string(), record(0, 5));
        index.records.insert(
            "b".to_string(),
            IndexRecord::new(
                DataReference {
                    stream_start: 5,
                    length: 7,
                },
                DataProperties {
                    is_compressed: true,
                    is_encrypted: true,
                },
            ),
        );

        file.save(&index).unwrap();
        let loaded = file.load().unwrap();
        assert_eq!(loaded, index);
    }

    #[test]
    fn save_replaces_previous_snapshot() {
        let file = IndexFile::new(Box::new(InMemoryBackend::new()));

        let mut large = Index::default();
        for i in 0..20u64 {
            large.records.insert(format!("key-{i}"), record(i * 4, 4));
        }
        file.save(&large).unwrap();

        // A smaller snapshot must fully replace the larger one, not
        // leave trailing bytes behind.
        let mut small = Index::default();
        small.records.insert("only".to_string(), record(0, 3));
        file.save(&small).unwrap();

        assert_eq!(file.load().unwrap(), small);
    }

    #[test]
    fn malformed_content_is_index_corruption() {
        let file = IndexFile::new(Box::new(InMemoryBackend::with_data(
            b"{not valid json".to_vec(),
        )));

        let result = file.load();
        assert!(matches!(result, Err(CairnError::IndexCorrupted { .. })));
    }

    #[test]
    fn contiguous_index_passes() {
        let mut index = Index::default();
        index.records.insert("a".to_string(), record(0, 5));
        index.records.insert("b".to_string(), record(5, 3));
        index.records.insert("c".to_string(), record(8, 11));

        index.check_contiguous().unwrap();
        assert_eq!(index.expected_data_len(), 19);
    }

    #[test]
    fn empty_index_is_contiguous() {
        Index::default().check_contiguous().unwrap();
    }

    #[test]
    fn gap_is_detected_and_names_key() {
        let mut index = Index::default();
        index.records.insert("a".to_string(), record(0, 5));
        index.records.insert("late".to_string(), record(6, 3));

        let err = index.check_contiguous().unwrap_err();
        match err {
            CairnError::IndexCorrupted { message } => {
                assert!(message.contains("late"));
                assert!(message.contains('5'));
                assert!(message.contains('6'));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_length_records_do_not_break_contiguity() {
        let mut index = Index::default();
        // Key order is the reverse of write order here, so the walk
        // must not rely on map order for same-offset records.
        index.records.insert("z".to_string(), record(0, 0));
        index.records.insert("a".to_string(), record(0, 2));
        index.records.insert("m".to_string(), record(2, 0));
        index.records.insert("b".to_string(), record(2, 3));

        index.check_contiguous().unwrap();
        assert_eq!(index.expected_data_len(), 5);
    }

    #[test]
    fn first_record_must_start_at_zero() {
        let mut index = Index::default();
        index.records.insert("a".to_string(), record(4, 5));

        assert!(matches!(
            index.check_contiguous(),
            Err(CairnError::IndexCorrupted { .. })
        ));
    }

    #[test]
    fn overlap_is_detected() {
        let mut index = Index::default();
        index.records.insert("a".to_string(), record(0, 5));
        index.records.insert("b".to_string(), record(3, 4));

        assert!(matches!(
            index.check_contiguous(),
            Err(CairnError::IndexCorrupted { .. })
        ));
    }
}
