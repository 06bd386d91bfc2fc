// Licensed under the Apache-2.0 license

//! Copies a candidate image out of its flash partition.
//!
//! Only the header's `total_size` is trusted here, and only as far as the
//! partition and buffer bounds allow. Everything else is left to the
//! verification engine.

use boot_image::{ImageHeader, IMAGE_HEADER_SIZE};
use romtime::HexWord;
use thiserror::Error;
use zerocopy::FromBytes;

use crate::flash::{FlashDrvError, FlashPartition};
use sigboot_error::SIGBOOT_ERROR_BASE;

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadError {
    #[error("flash read failed: {0:?}")]
    Flash(FlashDrvError),
    #[error("partition is too small to hold an image header")]
    NoImage,
    #[error("image of {size} bytes does not fit the partition")]
    ImageTooLarge { size: usize },
    #[error("image of {size} bytes does not fit the load buffer")]
    BufferTooSmall { size: usize },
}

impl From<FlashDrvError> for LoadError {
    fn from(err: FlashDrvError) -> Self {
        LoadError::Flash(err)
    }
}

impl LoadError {
    pub fn code(&self) -> u32 {
        match self {
            LoadError::Flash(err) => SIGBOOT_ERROR_BASE | 0x0500 | usize::from(*err) as u32,
            LoadError::NoImage => SIGBOOT_ERROR_BASE | 0x0581,
            LoadError::ImageTooLarge { .. } => SIGBOOT_ERROR_BASE | 0x0582,
            LoadError::BufferTooSmall { .. } => SIGBOOT_ERROR_BASE | 0x0583,
        }
    }
}

/// Reads the image stored at the start of `partition` into `buf` and returns
/// the filled prefix.
pub fn load_image<'b>(
    partition: &FlashPartition,
    buf: &'b mut [u8],
) -> Result<&'b [u8], LoadError> {
    let mut header = [0u8; IMAGE_HEADER_SIZE];
    if partition.len() < IMAGE_HEADER_SIZE {
        return Err(LoadError::NoImage);
    }
    partition.read(0, &mut header)?;
    let header = ImageHeader::ref_from_bytes(&header).map_err(|_| LoadError::NoImage)?;

    let size = header.total_size.get() as usize;
    if size > partition.len() {
        return Err(LoadError::ImageTooLarge { size });
    }
    let image = buf
        .get_mut(..size)
        .ok_or(LoadError::BufferTooSmall { size })?;
    partition.read(0, image)?;

    romtime::println!(
        "[sigboot] Loaded {} bytes from partition {} ({})",
        size,
        partition.name(),
        HexWord(header.magic.get())
    );
    Ok(image)
}
