// Licensed under the Apache-2.0 license

//! Trust anchors baked into the bootloader.
//!
//! A [`KeyStore`] is built once, in a `const` context, from byte buffers
//! embedded at build time:
//!
//! ```ignore
//! static KEYS: KeyStore<'static, 2> = KeyStore::new(
//!     [
//!         KeyRecord::with_key_id(include_bytes!("vendor-0.pub.bin"), 0x10),
//!         KeyRecord::new(include_bytes!("vendor-1.pub.bin")),
//!     ],
//!     None,
//! );
//! ```
//!
//! There is no way to modify a store after construction. An empty table is
//! rejected at compile time.

use boot_image::EncryptionScheme;
use sigboot_error::KeyStoreError;

/// One public verification key.
///
/// The key bytes and their length are a single slice, so they cannot
/// disagree. The encoding is whatever the signature verifier expects
/// (SEC1 uncompressed for P-384) and is not validated here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyRecord<'a> {
    key: &'a [u8],
    key_id: Option<u32>,
}

impl<'a> KeyRecord<'a> {
    pub const fn new(key: &'a [u8]) -> Self {
        KeyRecord { key, key_id: None }
    }

    pub const fn with_key_id(key: &'a [u8], key_id: u32) -> Self {
        KeyRecord {
            key,
            key_id: Some(key_id),
        }
    }

    pub fn public_key(&self) -> &'a [u8] {
        self.key
    }

    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    pub fn key_id(&self) -> Option<u32> {
        self.key_id
    }
}

/// Key-encryption key used to unwrap per-image payload keys.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EncryptionKey<'a> {
    scheme: EncryptionScheme,
    key: &'a [u8],
}

impl<'a> EncryptionKey<'a> {
    pub const fn new(scheme: EncryptionScheme, key: &'a [u8]) -> Self {
        EncryptionKey { scheme, key }
    }

    pub fn scheme(&self) -> EncryptionScheme {
        self.scheme
    }

    pub fn key(&self) -> &'a [u8] {
        self.key
    }

    /// True when the key length is the one its scheme requires.
    pub fn is_well_formed(&self) -> bool {
        self.key.len() == self.scheme.key_len()
    }
}

// Never print secret key material.
impl core::fmt::Debug for EncryptionKey<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("scheme", &self.scheme)
            .field("len", &self.key.len())
            .finish()
    }
}

/// Fixed-capacity, immutable table of trust anchors plus an optional
/// decryption key.
#[derive(Debug)]
pub struct KeyStore<'a, const N: usize> {
    keys: [KeyRecord<'a>; N],
    encryption_key: Option<EncryptionKey<'a>>,
}

impl<'a, const N: usize> KeyStore<'a, N> {
    const NOT_EMPTY: () = assert!(N > 0, "a key store needs at least one public key");

    pub const fn new(keys: [KeyRecord<'a>; N], encryption_key: Option<EncryptionKey<'a>>) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NOT_EMPTY;
        KeyStore {
            keys,
            encryption_key,
        }
    }

    pub const fn key_count(&self) -> usize {
        N
    }

    pub fn key_at(&self, index: usize) -> Result<&KeyRecord<'a>, KeyStoreError> {
        self.keys
            .get(index)
            .ok_or(KeyStoreError::IndexOutOfRange { index, count: N })
    }

    /// First key, in table order, carrying `key_id`.
    pub fn find_by_key_id(&self, key_id: u32) -> Option<(usize, &KeyRecord<'a>)> {
        self.iter().find(|(_, key)| key.key_id == Some(key_id))
    }

    /// All keys with their indices, in table order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &KeyRecord<'a>)> + '_ {
        self.keys.iter().enumerate()
    }

    pub fn encryption_key(&self) -> Option<&EncryptionKey<'a>> {
        self.encryption_key.as_ref()
    }
}
