//! Cryptographic operations for Cairn.
//!
//! Records are encrypted with AES-CBC and PKCS#7 padding. Every
//! encryption call generates a fresh random 16-byte IV, which is stored
//! as a fixed-length prefix immediately before the ciphertext inside
//! the record's payload region. Decryption reads the prefix back out
//! before invoking the block cipher.
//!
//! A decryption that fails to unpad is reported as
//! [`CairnError::InvalidEncryptionKey`]: it is the expected, diagnosable
//! symptom of reading an encrypted store with the wrong key.

use crate::error::{CairnError, CairnResult};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the AES block and of the stored IV prefix, in bytes.
pub const IV_SIZE: usize = 16;

/// Valid AES key sizes in bytes.
pub const VALID_KEY_SIZES: [usize; 3] = [16, 24, 32];

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
enum KeyBytes {
    Aes128([u8; 16]),
    Aes192([u8; 24]),
    Aes256([u8; 32]),
}

/// An AES encryption key of any valid length (128, 192 or 256 bits).
///
/// The key material is zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: KeyBytes,
}

impl EncryptionKey {
    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CairnError::InvalidKeySize`] if the slice is not 16,
    /// 24 or 32 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> CairnResult<Self> {
        let bytes = match bytes.len() {
            16 => {
                let mut key = [0u8; 16];
                key.copy_from_slice(bytes);
                KeyBytes::Aes128(key)
            }
            24 => {
                let mut key = [0u8; 24];
                key.copy_from_slice(bytes);
                KeyBytes::Aes192(key)
            }
            32 => {
                let mut key = [0u8; 32];
                key.copy_from_slice(bytes);
                KeyBytes::Aes256(key)
            }
            actual => return Err(CairnError::InvalidKeySize { actual }),
        };

        Ok(Self { bytes })
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// AES-CBC cipher over a configured [`EncryptionKey`].
///
/// Output format of [`encrypt`](Self::encrypt):
/// `iv (16 bytes) || ciphertext (PKCS#7 padded)`.
pub(crate) struct AesCbcCipher {
    key: EncryptionKey,
}

impl AesCbcCipher {
    pub(crate) fn new(key: EncryptionKey) -> Self {
        Self { key }
    }

    /// Encrypts a payload, prepending a fresh random IV.
    pub(crate) fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut iv = [0u8; IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext = match &self.key.bytes {
            KeyBytes::Aes128(key) => cbc::Encryptor::<aes::Aes128>::new(key.into(), (&iv).into())
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            KeyBytes::Aes192(key) => cbc::Encryptor::<aes::Aes192>::new(key.into(), (&iv).into())
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            KeyBytes::Aes256(key) => cbc::Encryptor::<aes::Aes256>::new(key.into(), (&iv).into())
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        };

        let mut payload = Vec::with_capacity(IV_SIZE + ciphertext.len());
        payload.extend_from_slice(&iv);
        payload.extend(ciphertext);
        payload
    }

    /// Decrypts a payload produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Returns [`CairnError::InvalidEncryptionKey`] if the payload is
    /// too short, not block-aligned, or fails to unpad - all symptoms
    /// of decrypting with a key other than the one it was written with.
    pub(crate) fn decrypt(&self, payload: &[u8]) -> CairnResult<Vec<u8>> {
        if payload.len() < IV_SIZE + IV_SIZE || (payload.len() - IV_SIZE) % IV_SIZE != 0 {
            return Err(CairnError::InvalidEncryptionKey);
        }

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&payload[..IV_SIZE]);
        let ciphertext = &payload[IV_SIZE..];

        let plaintext = match &self.key.bytes {
            KeyBytes::Aes128(key) => cbc::Decryptor::<aes::Aes128>::new(key.into(), (&iv).into())
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            KeyBytes::Aes192(key) => cbc::Decryptor::<aes::Aes192>::new(key.into(), (&iv).into())
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            KeyBytes::Aes256(key) => cbc::Decryptor::<aes::Aes256>::new(key.into(), (&iv).into())
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        };

        plaintext.map_err(|_| CairnError::InvalidEncryptionKey)
    }
}

impl std::fmt::Debug for AesCbcCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesCbcCipher").finish_non_exhaustive()
    }
}
