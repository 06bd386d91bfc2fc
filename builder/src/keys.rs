// Licensed under the Apache-2.0 license

//! Loading of ECDSA P-384 key material.
//!
//! Signing keys are PKCS#8 PEM. Public keys are either SPKI PEM or raw SEC1
//! points, which is also the form the bootloader embeds.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use boot_image::SHA384_DIGEST_SIZE;
use ecdsa::signature::hazmat::PrehashSigner;
use p384::ecdsa::{Signature, SigningKey};
use p384::elliptic_curve::sec1::ToEncodedPoint;
use p384::pkcs8::{DecodePrivateKey, DecodePublicKey};
use p384::{PublicKey, SecretKey};

use crate::image::ImageSigner;

/// Raw `r || s` signature size.
pub const ECDSA_P384_SIG_LEN: usize = 96;

impl ImageSigner for SigningKey {
    fn signature_len(&self) -> usize {
        ECDSA_P384_SIG_LEN
    }

    fn sign(&self, digest: &[u8; SHA384_DIGEST_SIZE]) -> Result<Vec<u8>> {
        let signature: Signature = self.sign_prehash(digest)?;
        Ok(signature.to_bytes().to_vec())
    }
}

pub fn signing_key_from_pem(pem: &str) -> Result<SigningKey> {
    let secret = SecretKey::from_pkcs8_pem(pem)
        .map_err(|e| anyhow!("Invalid PKCS#8 P-384 private key: {}", e))?;
    Ok(SigningKey::from(secret))
}

pub fn load_signing_key(path: &Path) -> Result<SigningKey> {
    let pem = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read signing key '{}'", path.display()))?;
    signing_key_from_pem(&pem).with_context(|| format!("Bad signing key '{}'", path.display()))
}

/// SEC1 uncompressed encoding of the verifying key (97 bytes).
pub fn public_key_bytes(key: &SigningKey) -> Vec<u8> {
    key.verifying_key()
        .to_encoded_point(false)
        .as_bytes()
        .to_vec()
}

/// Reads a public key as raw SEC1 bytes.
pub fn load_public_key(path: &Path) -> Result<Vec<u8>> {
    let data = std::fs::read(path)
        .with_context(|| format!("Cannot read public key '{}'", path.display()))?;
    let key = if data.starts_with(b"-----BEGIN") {
        let pem = std::str::from_utf8(&data).context("PEM file is not UTF-8")?;
        PublicKey::from_public_key_pem(pem)
            .map_err(|e| anyhow!("Invalid P-384 public key '{}': {}", path.display(), e))?
    } else {
        PublicKey::from_sec1_bytes(&data)
            .map_err(|_| anyhow!("Invalid SEC1 P-384 public key '{}'", path.display()))?
    };
    Ok(key.to_encoded_point(false).as_bytes().to_vec())
}
