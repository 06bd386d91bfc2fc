// Licensed under the Apache-2.0 license

//! Generic interface for reading boot images from flash storage.

use core::result::Result;

/// Read access to the flash storage holding boot images. Drivers for the
/// flash controller implement this trait. The boot path never writes.
pub trait FlashStorage {
    /// Read from the flash storage, filling the provided buffer with data
    fn read(&self, buffer: &mut [u8], address: usize) -> Result<(), FlashDrvError>;

    /// Returns the size of the flash storage in bytes.
    fn capacity(&self) -> usize;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum FlashDrvError {
    // Reserved value, for when "no error" / "success" should be
    // encoded in the same numeric representation as FlashDrvError
    //
    // Ok(()) = 0,
    /// Generic failure condition
    FAIL = 1,
    /// Parameter passed was too large
    SIZE = 7,
}

impl From<FlashDrvError> for usize {
    fn from(err: FlashDrvError) -> usize {
        err as usize
    }
}

/// Flash that is mapped into the address space, or an image file already
/// read into memory on the host.
pub struct MemoryFlash<'a> {
    data: &'a [u8],
}

impl<'a> MemoryFlash<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        MemoryFlash { data }
    }
}

impl FlashStorage for MemoryFlash<'_> {
    fn read(&self, buffer: &mut [u8], address: usize) -> Result<(), FlashDrvError> {
        let end = address.checked_add(buffer.len()).ok_or(FlashDrvError::SIZE)?;
        let src = self.data.get(address..end).ok_or(FlashDrvError::SIZE)?;
        buffer.copy_from_slice(src);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}
