// Licensed under the Apache-2.0 license

//! Host-side construction of signed boot images.

mod image;
mod keys;

pub use image::{ImageBuilder, ImageSigner};
pub use keys::{
    load_public_key, load_signing_key, public_key_bytes, signing_key_from_pem, ECDSA_P384_SIG_LEN,
};

use anyhow::{Context, Result};
use boot_image::SHA384_DIGEST_SIZE;
use sha2::{Digest, Sha384};
use std::path::Path;

pub fn sha384(data: &[u8]) -> [u8; SHA384_DIGEST_SIZE] {
    Sha384::digest(data).into()
}

pub fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Cannot read image '{}'", path.display()))
}

pub fn write_image(path: &Path, image: &[u8]) -> Result<()> {
    std::fs::write(path, image).with_context(|| format!("Cannot write image '{}'", path.display()))
}
