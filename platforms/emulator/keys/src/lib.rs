// Licensed under the Apache-2.0 license

//! Trust anchors, encryption key and verification policy of the emulator
//! platform.
//!
//! The public keys are SEC1 uncompressed P-384 points generated together
//! with the PEM signing keys under `test-keys/`. Real platforms replace
//! all of them at provisioning time.

#![cfg_attr(target_arch = "riscv32", no_std)]

use boot_image::{EncryptionScheme, TLV_SHA384};
use sigboot_config::VerifyPolicy;
use sigboot_rom::{EncryptionKey, KeyRecord, KeyStore};

pub const VENDOR_KEY_0_ID: u32 = 0x10;
pub const VENDOR_KEY_1_ID: u32 = 0x11;

pub static VENDOR_KEY_0: [u8; 97] = *include_bytes!("../keys/vendor-0.pub.bin");
pub static VENDOR_KEY_1: [u8; 97] = *include_bytes!("../keys/vendor-1.pub.bin");

// AES-256 key-encryption key. Emulator only.
static ENC_KEY: [u8; 32] = *include_bytes!("../keys/enc-aes256kw.key");

pub static EMULATOR_KEYS: KeyStore<'static, 2> = KeyStore::new(
    [
        KeyRecord::with_key_id(&VENDOR_KEY_0, VENDOR_KEY_0_ID),
        KeyRecord::with_key_id(&VENDOR_KEY_1, VENDOR_KEY_1_ID),
    ],
    Some(EncryptionKey::new(EncryptionScheme::AesKw256, &ENC_KEY)),
);

pub static EMULATOR_POLICY: VerifyPolicy<'static> = VerifyPolicy::new(false, &[TLV_SHA384], 0);

/// Flash slot holding the boot image.
pub struct ImageSlot {
    pub name: &'static str,
    pub offset: usize,
    pub size: usize,
}

pub const BLOCK_SIZE: usize = 64 * 1024;

pub const PRIMARY_SLOT: ImageSlot = ImageSlot {
    name: "primary",
    offset: 0,
    size: BLOCK_SIZE * 4,
};

pub const SECONDARY_SLOT: ImageSlot = ImageSlot {
    name: "secondary",
    offset: BLOCK_SIZE * 4,
    size: BLOCK_SIZE * 4,
};

/// Signing keys matching the trust anchors, for host tools and tests.
///
/// `VENDOR_2` is not in [`EMULATOR_KEYS`]; images signed with it must be
/// rejected.
pub mod test_keys {
    pub const VENDOR_0: &str = include_str!("../test-keys/vendor-0.pem");
    pub const VENDOR_1: &str = include_str!("../test-keys/vendor-1.pem");
    pub const VENDOR_2: &str = include_str!("../test-keys/vendor-2.pem");
    pub const VENDOR_2_PUBLIC: &[u8; 97] = include_bytes!("../keys/vendor-2.pub.bin");
}
