// Licensed under the Apache-2.0 license

use crate::flash::hil::{FlashDrvError, FlashStorage};

/// Represents an image slot within the flash memory.
///
/// A `FlashPartition` provides a read-only view into a contiguous region of
/// the underlying flash. Each partition is associated with a name, a base
/// offset, and a length, and every read is checked against the partition's
/// boundaries.
pub struct FlashPartition<'a> {
    driver: &'a dyn FlashStorage,
    name: &'static str,
    base_offset: usize,
    length: usize,
}

impl<'a> FlashPartition<'a> {
    /// Creates a new `FlashPartition` instance.
    ///
    /// Returns `Err(FlashDrvError::SIZE)` if the partition does not fit within
    /// the flash capacity.
    pub fn new(
        driver: &'a dyn FlashStorage,
        name: &'static str,
        base_offset: usize,
        length: usize,
    ) -> Result<Self, FlashDrvError> {
        match base_offset.checked_add(length) {
            Some(end) if end <= driver.capacity() => {}
            _ => return Err(FlashDrvError::SIZE),
        }
        Ok(FlashPartition {
            driver,
            name,
            base_offset,
            length,
        })
    }

    /// Reads data from the partition into `buf`, starting at
    /// `partition_offset` within the partition.
    ///
    /// Returns `Err(FlashDrvError::SIZE)` if the requested range exceeds the
    /// partition size, or propagates errors from the underlying flash
    /// controller.
    pub fn read(&self, partition_offset: usize, buf: &mut [u8]) -> Result<(), FlashDrvError> {
        match partition_offset.checked_add(buf.len()) {
            Some(end) if end <= self.length => {}
            _ => return Err(FlashDrvError::SIZE),
        }
        self.driver.read(buf, self.base_offset + partition_offset)
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
