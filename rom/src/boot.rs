// Licensed under the Apache-2.0 license

//! Boot flow for one image slot: load, verify, then stage the payload.

use boot_image::ImageVersion;
use romtime::{HexPrefix, HexWord};
use sigboot_error::{CryptoError, RejectReason, SIGBOOT_ERROR_BASE};
use thiserror::Error;

use crate::crypto::Decryptor;
use crate::flash::FlashPartition;
use crate::image_loader::{load_image, LoadError};
use crate::image_verifier::ImageVerifier;

/// A verified payload staged in the destination buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BootImage {
    pub load_addr: u32,
    pub version: ImageVersion,
    pub key_index: usize,
    pub payload_len: usize,
    pub encrypted: bool,
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootError {
    #[error("failed to load image: {0}")]
    Load(LoadError),
    #[error("image rejected: {0}")]
    Rejected(RejectReason),
    #[error("destination too small for a {needed} byte payload")]
    DestinationTooSmall { needed: usize },
    #[error("image is encrypted but no decryptor is available")]
    DecryptorMissing,
    #[error("payload decryption failed: {0}")]
    Decrypt(CryptoError),
}

impl From<LoadError> for BootError {
    fn from(err: LoadError) -> Self {
        BootError::Load(err)
    }
}

impl BootError {
    /// Code reported through the fatal error path.
    pub fn code(&self) -> u32 {
        match self {
            BootError::Load(err) => err.code(),
            BootError::Rejected(reason) => reason.code(),
            BootError::DestinationTooSmall { .. } => SIGBOOT_ERROR_BASE | 0x0601,
            BootError::DecryptorMissing => SIGBOOT_ERROR_BASE | 0x0602,
            BootError::Decrypt(err) => err.code(),
        }
    }
}

/// Loads the image in `partition` into `buf`, verifies it and copies or
/// decrypts its payload into `dest`.
///
/// Nothing is written to `dest` unless the image was accepted.
pub fn boot_candidate(
    partition: &FlashPartition,
    buf: &mut [u8],
    verifier: &dyn ImageVerifier,
    decryptor: Option<&dyn Decryptor>,
    dest: &mut [u8],
) -> Result<BootImage, BootError> {
    let image = load_image(partition, buf)?;
    let authenticated = verifier.authenticate(image).map_err(BootError::Rejected)?;

    let body = authenticated.body();
    let out = dest
        .get_mut(..body.len())
        .ok_or(BootError::DestinationTooSmall { needed: body.len() })?;

    let meta = authenticated.metadata();
    match meta.encryption {
        Some(params) => {
            let key = authenticated
                .encryption_key()
                .ok_or(BootError::Rejected(RejectReason::EncryptionKeyMissing))?;
            let decryptor = decryptor.ok_or(BootError::DecryptorMissing)?;
            if let Err(err) = decryptor.decrypt(body, key, &params, out) {
                // No partial plaintext is left behind.
                out.fill(0);
                return Err(BootError::Decrypt(err));
            }
        }
        None => out.copy_from_slice(body),
    }

    let header = meta.header;
    romtime::println!(
        "[sigboot] Staged {} {} bytes for {} (digest {})",
        header.image_version,
        body.len(),
        HexWord(header.load_addr.get()),
        HexPrefix::<8>(authenticated.digest())
    );
    Ok(BootImage {
        load_addr: header.load_addr.get(),
        version: header.image_version,
        key_index: authenticated.key_index(),
        payload_len: body.len(),
        encrypted: meta.encryption.is_some(),
    })
}

/// Like [`boot_candidate`], but any failure ends in [`crate::fatal_error`].
pub fn boot_or_halt(
    partition: &FlashPartition,
    buf: &mut [u8],
    verifier: &dyn ImageVerifier,
    decryptor: Option<&dyn Decryptor>,
    dest: &mut [u8],
) -> BootImage {
    match boot_candidate(partition, buf, verifier, decryptor, dest) {
        Ok(image) => image,
        Err(err) => {
            romtime::println!("[sigboot] Boot failed: {}", err);
            crate::fatal_error(err.code())
        }
    }
}
