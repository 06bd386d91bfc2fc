// Licensed under the Apache-2.0 license

//! Cryptographic capabilities consumed by the verifier and the boot flow.
//!
//! The core never implements primitives itself. Platforms plug in hardware
//! engines; host builds can use [`crate::rustcrypto`].

use boot_image::{EncryptionParams, SHA384_DIGEST_SIZE};
use sigboot_error::CryptoError;

use crate::key_store::EncryptionKey;

pub type ImageDigest = [u8; SHA384_DIGEST_SIZE];

pub trait DigestEngine {
    /// SHA-384 over `data`.
    fn digest(&self, data: &[u8]) -> Result<ImageDigest, CryptoError>;
}

pub trait SignatureVerifier {
    /// Returns true only if `signature` is a valid signature of `digest`
    /// under `public_key`. Malformed keys or signatures verify as false.
    fn verify(&self, digest: &ImageDigest, signature: &[u8], public_key: &[u8]) -> bool;
}

pub trait Decryptor {
    /// Unwraps the payload key from `params` with `key` and decrypts
    /// `ciphertext` into `out`, which has the same length.
    fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &EncryptionKey,
        params: &EncryptionParams,
        out: &mut [u8],
    ) -> Result<(), CryptoError>;
}

impl<T: DigestEngine + ?Sized> DigestEngine for &T {
    fn digest(&self, data: &[u8]) -> Result<ImageDigest, CryptoError> {
        (**self).digest(data)
    }
}

impl<T: SignatureVerifier + ?Sized> SignatureVerifier for &T {
    fn verify(&self, digest: &ImageDigest, signature: &[u8], public_key: &[u8]) -> bool {
        (**self).verify(digest, signature, public_key)
    }
}
