//! Payload transform pipeline.
//!
//! Transforms are applied in a fixed order: compression first, then
//! encryption. Reading reverses it: decrypt, then decompress. The flags
//! a payload was written with are recorded per record in the index
//! ([`DataProperties`]) and drive the reverse transform, independent of
//! what the current configuration requests for new writes.

use crate::crypto::{AesCbcCipher, EncryptionKey};
use crate::error::{CairnError, CairnResult};
use crate::index::DataProperties;
use flate2::read::{DeflateDecoder, DeflateEncoder};
use flate2::Compression;
use std::io::Read;

/// Per-write transform request supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamInfo {
    /// Compress the payload before storing it.
    pub compress: bool,
    /// Encrypt the payload before storing it. Requires a configured
    /// encryption key.
    pub encrypt: bool,
}

impl StreamInfo {
    /// Request to store the payload verbatim.
    #[must_use]
    pub fn plain() -> Self {
        Self::default()
    }

    /// Request compression only.
    #[must_use]
    pub fn compressed() -> Self {
        Self {
            compress: true,
            encrypt: false,
        }
    }

    /// Request encryption only.
    #[must_use]
    pub fn encrypted() -> Self {
        Self {
            compress: false,
            encrypt: true,
        }
    }

    /// Request compression and encryption.
    #[must_use]
    pub fn compressed_and_encrypted() -> Self {
        Self {
            compress: true,
            encrypt: true,
        }
    }
}

/// Applies and reverses payload transforms for one store instance.
#[derive(Debug)]
pub(crate) struct TransformPipeline {
    cipher: Option<AesCbcCipher>,
}

impl TransformPipeline {
    pub(crate) fn new(key: Option<EncryptionKey>) -> Self {
        Self {
            cipher: key.map(AesCbcCipher::new),
        }
    }

    /// Transforms a payload for storage: compress, then encrypt.
    ///
    /// # Errors
    ///
    /// Returns [`CairnError::EncryptionNotConfigured`] if encryption is
    /// requested without a configured key.
    pub(crate) fn pack(
        &self,
        data: &[u8],
        info: StreamInfo,
    ) -> CairnResult<(Vec<u8>, DataProperties)> {
        if info.encrypt && self.cipher.is_none() {
            return Err(CairnError::EncryptionNotConfigured);
        }

        let mut payload = if info.compress {
            let mut compressed = Vec::new();
            DeflateEncoder::new(data, Compression::default()).read_to_end(&mut compressed)?;
            compressed
        } else {
            data.to_vec()
        };

        if info.encrypt {
            if let Some(cipher) = &self.cipher {
                payload = cipher.encrypt(&payload);
            }
        }

        let properties = DataProperties {
            is_compressed: info.compress,
            is_encrypted: info.encrypt,
        };
        Ok((payload, properties))
    }

    /// Reverses the stored transforms: decrypt, then decompress.
    ///
    /// # Errors
    ///
    /// Returns [`CairnError::EncryptionNotConfigured`] if the record is
    /// encrypted and no key is configured, or
    /// [`CairnError::InvalidEncryptionKey`] if decryption fails.
    pub(crate) fn unpack(
        &self,
        payload: &[u8],
        properties: DataProperties,
    ) -> CairnResult<Vec<u8>> {
        let decrypted = if properties.is_encrypted {
            let cipher = self
                .cipher
                .as_ref()
                .ok_or(CairnError::EncryptionNotConfigured)?;
            cipher.decrypt(payload)?
        } else {
            payload.to_vec()
        };

        if properties.is_compressed {
            let mut data = Vec::new();
            DeflateDecoder::new(decrypted.as_slice()).read_to_end(&mut data)?;
            Ok(data)
        } else {
            Ok(decrypted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pipeline_with_key() -> TransformPipeline {
        TransformPipeline::new(Some(EncryptionKey::from_bytes(&[0x42; 32]).unwrap()))
    }

    #[test]
    fn plain_pack_is_identity() {
        let pipeline = TransformPipeline::new(None);
        let (payload, props) = pipeline.pack(b"raw bytes", StreamInfo::plain()).unwrap();

        assert_eq!(payload, b"raw bytes");
        assert_eq!(props, DataProperties::default());
    }

    #[test]
    fn compression_shrinks_repetitive_data() {
        let pipeline = TransformPipeline::new(None);
        let data = vec![0xAB; 4096];

        let (payload, props) = pipeline.pack(&data, StreamInfo::compressed()).unwrap();
        assert!(payload.len() < data.len());
        assert!(props.is_compressed);
        assert!(!props.is_encrypted);

        assert_eq!(pipeline.unpack(&payload, props).unwrap(), data);
    }

    #[test]
    fn encrypt_without_key_fails() {
        let pipeline = TransformPipeline::new(None);

        assert!(matches!(
            pipeline.pack(b"secret", StreamInfo::encrypted()),
            Err(CairnError::EncryptionNotConfigured)
        ));
    }

    #[test]
    fn unpack_encrypted_without_key_fails() {
        let writer = pipeline_with_key();
        let (payload, props) = writer.pack(b"secret", StreamInfo::encrypted()).unwrap();

        let reader = TransformPipeline::new(None);
        assert!(matches!(
            reader.unpack(&payload, props),
            Err(CairnError::EncryptionNotConfigured)
        ));
    }

    #[test]
    fn unpack_with_wrong_key_fails() {
        let writer = pipeline_with_key();
        let (payload, props) = writer
            .pack(
                b"a payload long enough to exercise padding",
                StreamInfo::encrypted(),
            )
            .unwrap();

        let reader =
            TransformPipeline::new(Some(EncryptionKey::from_bytes(&[0x24; 32]).unwrap()));
        assert!(matches!(
            reader.unpack(&payload, props),
            Err(CairnError::InvalidEncryptionKey)
        ));
    }

    #[test]
    fn encrypted_payload_is_opaque() {
        let pipeline = pipeline_with_key();
        let data = b"plainly visible text";

        let (payload, _) = pipeline.pack(data, StreamInfo::encrypted()).unwrap();
        assert!(!payload
            .windows(data.len())
            .any(|window| window == data.as_slice()));
    }

    proptest! {
        #[test]
        fn pack_unpack_roundtrip(
            data in proptest::collection::vec(any::<u8>(), 0..2048),
            compress in any::<bool>(),
            encrypt in any::<bool>(),
        ) {
            let pipeline = pipeline_with_key();
            let info = StreamInfo { compress, encrypt };

            let (payload, props) = pipeline.pack(&data, info).unwrap();
            prop_assert_eq!(props.is_compressed, compress);
            prop_assert_eq!(props.is_encrypted, encrypt);
            prop_assert_eq!(pipeline.unpack(&payload, props).unwrap(), data);
        }
    }
}
