// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Envelope encryption for records at rest.
//!
//! AES-GCM with a random 96-bit nonce per call. The key length selects the
//! variant (16 → AES-128, 24 → AES-192, 32 → AES-256).
//!
//! Ciphertext wire format:
//!   [ nonce (12 bytes) | ciphertext + tag (16 bytes) ]

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, Nonce};

/// Nonce length shared by every AES-GCM variant used here.
pub const NONCE_LEN: usize = 12;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Errors raised by [`CryptoService`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length {0} (expected 16, 24 or 32 bytes)")]
    InvalidKey(usize),

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("encryption failed")]
    EncryptionFailed,
}

pub type CryptoResult<T> = Result<T, CryptoError>;

enum Cipher {
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

/// Symmetric authenticated encryption with a fixed key.
pub struct CryptoService {
    cipher: Cipher,
}

impl CryptoService {
    /// Build the service, rejecting unsupported key lengths up front.
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        let invalid = |_| CryptoError::InvalidKey(key.len());
        let cipher = match key.len() {
            16 => Cipher::Aes128(Aes128Gcm::new_from_slice(key).map_err(invalid)?),
            24 => Cipher::Aes192(Aes192Gcm::new_from_slice(key).map_err(invalid)?),
            32 => Cipher::Aes256(Aes256Gcm::new_from_slice(key).map_err(invalid)?),
            other => return Err(CryptoError::InvalidKey(other)),
        };
        Ok(Self { cipher })
    }

    /// Seal `plaintext` and prepend the nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = match &self.cipher {
            Cipher::Aes128(c) => c.encrypt(&nonce, plaintext),
            Cipher::Aes192(c) => c.encrypt(&nonce, plaintext),
            Cipher::Aes256(c) => c.encrypt(&nonce, plaintext),
        }
        .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Split the leading nonce and open the remainder.
    pub fn decrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        if data.len() < NONCE_LEN {
            return Err(CryptoError::DecryptionFailed);
        }
        let (nonce_bytes, sealed) = data.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        match &self.cipher {
            Cipher::Aes128(c) => c.decrypt(nonce, sealed),
            Cipher::Aes192(c) => c.decrypt(nonce, sealed),
            Cipher::Aes256(c) => c.decrypt(nonce, sealed),
        }
        .map_err(|_| CryptoError::DecryptionFailed)
    }
}

impl std::fmt::Debug for CryptoService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self.cipher {
            Cipher::Aes128(_) => "AES-128-GCM",
            Cipher::Aes192(_) => "AES-192-GCM",
            Cipher::Aes256(_) => "AES-256-GCM",
        };
        f.debug_struct("CryptoService")
            .field("cipher", &variant)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> CryptoService {
        CryptoService::new(&[7u8; 32]).unwrap()
    }

    #[test]
    fn round_trip_various_lengths() {
        let crypto = service();
        for len in [0usize, 1, 15, 16, 17, 1024] {
            let plaintext: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let sealed = crypto.encrypt(&plaintext).unwrap();
            assert_eq!(sealed.len(), NONCE_LEN + plaintext.len() + 16);
            assert_eq!(crypto.decrypt(&sealed).unwrap(), plaintext);
        }
    }

    #[test]
    fn same_plaintext_encrypts_differently() {
        let crypto = service();
        let first = crypto.encrypt(b"hunter2").unwrap();
        let second = crypto.encrypt(b"hunter2").unwrap();
        assert_ne!(first, second);
        assert_eq!(crypto.decrypt(&first).unwrap(), b"hunter2");
        assert_eq!(crypto.decrypt(&second).unwrap(), b"hunter2");
    }

    #[test]
    fn accepts_all_aes_key_sizes() {
        for len in [16usize, 24, 32] {
            let crypto = CryptoService::new(&vec![1u8; len]).unwrap();
            let sealed = crypto.encrypt(b"payload").unwrap();
            assert_eq!(crypto.decrypt(&sealed).unwrap(), b"payload");
        }
    }

    #[test]
    fn rejects_invalid_key_sizes() {
        for len in [0usize, 1, 15, 17, 31, 33, 64] {
            let err = CryptoService::new(&vec![1u8; len]).unwrap_err();
            assert_eq!(err, CryptoError::InvalidKey(len));
        }
    }

    #[test]
    fn flipped_byte_fails_authentication() {
        let crypto = service();
        let sealed = crypto.encrypt(b"card 4111 1111 1111 1111").unwrap();
        for i in 0..sealed.len() {
            let mut tampered = sealed.clone();
            tampered[i] ^= 0x01;
            assert_eq!(
                crypto.decrypt(&tampered).unwrap_err(),
                CryptoError::DecryptionFailed,
                "byte {i} flipped but decryption succeeded"
            );
        }
    }

    #[test]
    fn short_or_truncated_input_fails() {
        let crypto = service();
        assert_eq!(
            crypto.decrypt(&[0u8; NONCE_LEN - 1]).unwrap_err(),
            CryptoError::DecryptionFailed
        );
        let sealed = crypto.encrypt(b"secret").unwrap();
        assert_eq!(
            crypto.decrypt(&sealed[..sealed.len() - 1]).unwrap_err(),
            CryptoError::DecryptionFailed
        );
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = service().encrypt(b"secret").unwrap();
        let other = CryptoService::new(&[8u8; 32]).unwrap();
        assert_eq!(other.decrypt(&sealed).unwrap_err(), CryptoError::DecryptionFailed);
    }
}
