// Licensed under the Apache-2.0 license

use crate::test::{emulator_image, vendor_key, EMULATOR_ENGINE};
use boot_image::{EncryptionParams, EncryptionScheme, ImageVersion};
use sigboot_emulator_keys::{ImageSlot, PRIMARY_SLOT, SECONDARY_SLOT, VENDOR_KEY_1_ID};
use sigboot_error::{CryptoError, RejectReason};
use sigboot_rom::{
    boot_candidate, BootError, BootImage, Decryptor, EncryptionKey, FlashPartition, FlashStorage,
    ImageVerifier, MemoryFlash,
};

const FLASH_SIZE: usize = SECONDARY_SLOT.offset + SECONDARY_SLOT.size;

/// Stream "cipher" keyed by the wrapped key and the key-encryption key.
/// Stands in for AES key unwrap plus payload decryption.
struct XorDecryptor;

fn keystream_byte(kek: &[u8], wrapped_key: &[u8], index: usize) -> u8 {
    kek[index % kek.len()] ^ wrapped_key[index % wrapped_key.len()]
}

impl Decryptor for XorDecryptor {
    fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &EncryptionKey,
        params: &EncryptionParams,
        out: &mut [u8],
    ) -> Result<(), CryptoError> {
        if out.len() != ciphertext.len() {
            return Err(CryptoError::BufferTooSmall);
        }
        for (i, (dst, byte)) in out.iter_mut().zip(ciphertext).enumerate() {
            *dst = byte ^ keystream_byte(key.key(), params.wrapped_key, i);
        }
        Ok(())
    }
}

fn flash_with(images: &[(&ImageSlot, &[u8])]) -> Vec<u8> {
    let mut flash = vec![0xff; FLASH_SIZE];
    for (slot, image) in images {
        flash[slot.offset..slot.offset + image.len()].copy_from_slice(image);
    }
    flash
}

fn partition<'a>(flash: &'a dyn FlashStorage, slot: &ImageSlot) -> FlashPartition<'a> {
    FlashPartition::new(flash, slot.name, slot.offset, slot.size).unwrap()
}

/// Tries each slot in order and boots the first one that verifies.
fn boot_first_valid(
    flash: &dyn FlashStorage,
    verifier: &dyn ImageVerifier,
    decryptor: Option<&dyn Decryptor>,
    dest: &mut [u8],
) -> Result<(&'static str, BootImage), Vec<BootError>> {
    let mut errors = Vec::new();
    let mut buf = vec![0u8; PRIMARY_SLOT.size];
    for slot in [&PRIMARY_SLOT, &SECONDARY_SLOT] {
        match boot_candidate(&partition(flash, slot), &mut buf, verifier, decryptor, dest) {
            Ok(image) => return Ok((slot.name, image)),
            Err(err) => errors.push(err),
        }
    }
    Err(errors)
}

#[test]
fn test_boot_primary() {
    let image = emulator_image(b"primary firmware")
        .version(ImageVersion::new(1, 4, 0, 12))
        .sign(&vendor_key(0))
        .unwrap();
    let data = flash_with(&[(&PRIMARY_SLOT, &image)]);
    let flash = MemoryFlash::new(&data);

    let mut dest = vec![0u8; 1024];
    let (slot, booted) = boot_first_valid(&flash, &EMULATOR_ENGINE, None, &mut dest).unwrap();
    assert_eq!(slot, "primary");
    assert_eq!(booted.load_addr, 0x4000_0000);
    assert_eq!(booted.version, ImageVersion::new(1, 4, 0, 12));
    assert_eq!(booted.key_index, 0);
    assert_eq!(&dest[..booted.payload_len], b"primary firmware");
}

#[test]
fn test_fall_back_to_secondary() {
    let evil = emulator_image(b"evil firmware")
        .sign(&vendor_key(2))
        .unwrap();
    let good = emulator_image(b"secondary firmware")
        .key_id(VENDOR_KEY_1_ID)
        .sign(&vendor_key(1))
        .unwrap();
    let data = flash_with(&[(&PRIMARY_SLOT, &evil), (&SECONDARY_SLOT, &good)]);
    let flash = MemoryFlash::new(&data);

    let mut dest = vec![0u8; 1024];
    let (slot, booted) = boot_first_valid(&flash, &EMULATOR_ENGINE, None, &mut dest).unwrap();
    assert_eq!(slot, "secondary");
    assert_eq!(booted.key_index, 1);
    assert_eq!(&dest[..booted.payload_len], b"secondary firmware");
}

#[test]
fn test_no_valid_image() {
    let evil = emulator_image(b"evil firmware")
        .sign(&vendor_key(2))
        .unwrap();
    let data = flash_with(&[(&PRIMARY_SLOT, &evil)]);
    let flash = MemoryFlash::new(&data);

    let mut dest = vec![0u8; 1024];
    let errors = boot_first_valid(&flash, &EMULATOR_ENGINE, None, &mut dest).unwrap_err();
    assert_eq!(errors[0], BootError::Rejected(RejectReason::BadSignature));
    // Erased slot: all-ones header.
    assert!(matches!(
        errors[1],
        BootError::Load(_) | BootError::Rejected(_)
    ));
    assert!(dest.iter().all(|&b| b == 0));
}

#[test]
fn test_boot_encrypted_image() {
    let kek = EMULATOR_ENGINE.keys().encryption_key().unwrap().key();
    let wrapped_key = [0xc3u8; 40];
    let plaintext = b"encrypted firmware payload";
    let ciphertext: Vec<u8> = plaintext
        .iter()
        .enumerate()
        .map(|(i, b)| b ^ keystream_byte(kek, &wrapped_key, i))
        .collect();

    let image = emulator_image(&ciphertext)
        .encrypted(EncryptionScheme::AesKw256, &wrapped_key)
        .sign(&vendor_key(0))
        .unwrap();
    let data = flash_with(&[(&PRIMARY_SLOT, &image)]);
    let flash = MemoryFlash::new(&data);

    let mut dest = vec![0u8; 1024];
    let (_, booted) =
        boot_first_valid(&flash, &EMULATOR_ENGINE, Some(&XorDecryptor), &mut dest).unwrap();
    assert!(booted.encrypted);
    assert_eq!(&dest[..booted.payload_len], plaintext);

    // Wrong key-wrap scheme for the platform key.
    let image = emulator_image(&ciphertext)
        .encrypted(EncryptionScheme::AesKw128, &[0xc3; 24])
        .sign(&vendor_key(0))
        .unwrap();
    let data = flash_with(&[(&PRIMARY_SLOT, &image)]);
    let flash = MemoryFlash::new(&data);
    let mut buf = vec![0u8; PRIMARY_SLOT.size];
    assert_eq!(
        boot_candidate(
            &partition(&flash, &PRIMARY_SLOT),
            &mut buf,
            &EMULATOR_ENGINE,
            Some(&XorDecryptor),
            &mut dest
        ),
        Err(BootError::Rejected(RejectReason::EncryptionSchemeMismatch))
    );
}
