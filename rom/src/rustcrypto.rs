// Licensed under the Apache-2.0 license

//! Software digest and signature engines backed by the RustCrypto crates.

use p384::ecdsa::signature::hazmat::PrehashVerifier;
use p384::ecdsa::{Signature, VerifyingKey};
use sha2::{Digest, Sha384};
use sigboot_error::CryptoError;

use crate::crypto::{DigestEngine, ImageDigest, SignatureVerifier};

#[derive(Clone, Copy, Debug, Default)]
pub struct Sha384Engine;

impl DigestEngine for Sha384Engine {
    fn digest(&self, data: &[u8]) -> Result<ImageDigest, CryptoError> {
        Ok(Sha384::digest(data).into())
    }
}

/// ECDSA P-384 over a SHA-384 prehash.
///
/// Public keys are SEC1 encoded points, signatures are raw `r || s`
/// (96 bytes).
#[derive(Clone, Copy, Debug, Default)]
pub struct EcdsaP384Verifier;

impl SignatureVerifier for EcdsaP384Verifier {
    fn verify(&self, digest: &ImageDigest, signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_sec1_bytes(public_key) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify_prehash(digest, &signature).is_ok()
    }
}
