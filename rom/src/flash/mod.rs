// Licensed under the Apache-2.0 license

mod flash_partition;
mod hil;

pub use flash_partition::FlashPartition;
pub use hil::{FlashDrvError, FlashStorage, MemoryFlash};
