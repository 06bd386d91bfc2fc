// Licensed under the Apache-2.0 license

//! Signed boot image format.
//!
//! ```text
//! +----------------------+  0
//! | ImageHeader          |
//! | (zero padding)       |
//! +----------------------+  header_size
//! | payload              |
//! +----------------------+  header_size + payload_size  (end of signed span)
//! | TlvInfo              |
//! | TLV entries ...      |
//! +----------------------+  total_size
//! ```
//!
//! The header and payload form the signed span. The trailer is not signed:
//! nothing in it is trusted until the signature over the signed span has
//! been checked, and it only carries data that is itself authenticated
//! (signature, digest) or that merely selects among trusted keys.

#![cfg_attr(target_arch = "riscv32", no_std)]

mod tlv;

use core::mem::size_of;
use core::ops::Range;

use sigboot_error::ParseError;
use zerocopy::byteorder::{BigEndian, LittleEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

pub use tlv::{TlvEntry, TlvIter};

pub const IMAGE_MAGIC: u32 = u32::from_be_bytes(*b"SBIM");
pub const HEADER_VERSION: u16 = 0x0001;
pub const IMAGE_HEADER_SIZE: usize = size_of::<ImageHeader>();

/// Header flag: the payload is encrypted and the trailer carries the wrapped key.
pub const IMAGE_F_ENCRYPTED: u32 = 1 << 0;

pub const TLV_INFO_MAGIC: u16 = 0x6907;
pub const TLV_INFO_SIZE: usize = size_of::<TlvInfo>();
pub const TLV_ENTRY_HEADER_SIZE: usize = size_of::<TlvEntryHeader>();

pub const TLV_KEY_ID: u16 = 0x0001;
pub const TLV_SHA384: u16 = 0x0011;
pub const TLV_ECDSA_P384: u16 = 0x0022;
pub const TLV_ENC_KW128: u16 = 0x0031;
pub const TLV_ENC_KW256: u16 = 0x0032;

pub const SHA384_DIGEST_SIZE: usize = 48;
pub const MAX_SIGNATURE_SIZE: usize = 512;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ImageVersion {
    pub major: u8,
    pub minor: u8,
    pub revision: U16<LittleEndian>,
    pub build: U32<LittleEndian>,
}

impl ImageVersion {
    pub fn new(major: u8, minor: u8, revision: u16, build: u32) -> Self {
        ImageVersion {
            major,
            minor,
            revision: revision.into(),
            build: build.into(),
        }
    }
}

impl core::fmt::Display for ImageVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}.{}.{}+{}",
            self.major,
            self.minor,
            self.revision.get(),
            self.build.get()
        )
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ImageHeader {
    pub magic: U32<BigEndian>,
    pub header_version: U16<LittleEndian>,
    pub header_size: U16<LittleEndian>,
    pub payload_size: U32<LittleEndian>,
    pub total_size: U32<LittleEndian>,
    pub flags: U32<LittleEndian>,
    pub load_addr: U32<LittleEndian>,
    pub image_version: ImageVersion,
    pub security_counter: U32<LittleEndian>,
}

impl ImageHeader {
    pub fn is_encrypted(&self) -> bool {
        self.flags.get() & IMAGE_F_ENCRYPTED != 0
    }

    /// Length of the signed span: header (with padding) plus payload.
    ///
    /// This is the only place the span is computed. The parser, the
    /// verification engine and the image builder all go through it.
    pub fn signed_len(&self) -> Option<usize> {
        usize::from(self.header_size.get()).checked_add(self.payload_size.get() as usize)
    }

    pub fn body_span(&self) -> Option<Range<usize>> {
        let start = usize::from(self.header_size.get());
        Some(start..self.signed_len()?)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct TlvInfo {
    pub magic: U16<LittleEndian>,
    /// Length of the whole trailer, including this header.
    pub tlv_total: U16<LittleEndian>,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct TlvEntryHeader {
    pub kind: U16<LittleEndian>,
    pub len: U16<LittleEndian>,
}

/// Key-wrap scheme protecting the per-image payload key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionScheme {
    AesKw128,
    AesKw256,
}

impl EncryptionScheme {
    pub const fn tlv_tag(self) -> u16 {
        match self {
            EncryptionScheme::AesKw128 => TLV_ENC_KW128,
            EncryptionScheme::AesKw256 => TLV_ENC_KW256,
        }
    }

    pub const fn from_tlv_tag(tag: u16) -> Option<Self> {
        match tag {
            TLV_ENC_KW128 => Some(EncryptionScheme::AesKw128),
            TLV_ENC_KW256 => Some(EncryptionScheme::AesKw256),
            _ => None,
        }
    }

    /// Size of the key-encryption key held by the bootloader.
    pub const fn key_len(self) -> usize {
        match self {
            EncryptionScheme::AesKw128 => 16,
            EncryptionScheme::AesKw256 => 32,
        }
    }

    /// Size of the wrapped payload key carried in the trailer (RFC 3394 adds 8 bytes).
    pub const fn wrapped_key_len(self) -> usize {
        self.key_len() + 8
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncryptionParams<'a> {
    pub scheme: EncryptionScheme,
    pub wrapped_key: &'a [u8],
}

/// Everything the verification engine needs from one image.
///
/// Borrows the image buffer; built fresh for every verification attempt.
#[derive(Clone, Debug)]
pub struct ImageMetadata<'a> {
    pub header: &'a ImageHeader,
    /// Header plus payload, exactly the bytes covered by the digest.
    pub signed: &'a [u8],
    pub body: &'a [u8],
    pub body_span: Range<usize>,
    pub trailer_span: Range<usize>,
    pub digest: Option<&'a [u8; SHA384_DIGEST_SIZE]>,
    pub signature: &'a [u8],
    pub key_id: Option<u32>,
    pub encryption: Option<EncryptionParams<'a>>,
}

/// Validated header and spans, before the trailer has been interpreted.
#[derive(Clone, Debug)]
pub struct ImageLayout<'a> {
    pub header: &'a ImageHeader,
    pub signed_span: Range<usize>,
    pub body_span: Range<usize>,
    pub trailer_span: Range<usize>,
}

impl<'a> ImageLayout<'a> {
    /// Checks the fixed header and every size derived from it against `image`.
    pub fn from_image(image: &'a [u8]) -> Result<Self, ParseError> {
        let (header, _) =
            ImageHeader::ref_from_prefix(image).map_err(|_| ParseError::TruncatedImage)?;
        if header.magic.get() != IMAGE_MAGIC {
            return Err(ParseError::MalformedHeader);
        }
        if header.header_version.get() != HEADER_VERSION {
            return Err(ParseError::UnsupportedVersion);
        }
        if usize::from(header.header_size.get()) < IMAGE_HEADER_SIZE {
            return Err(ParseError::MalformedHeader);
        }
        let total = header.total_size.get() as usize;
        if total > image.len() {
            return Err(ParseError::TruncatedImage);
        }
        if header.payload_size.get() == 0 {
            return Err(ParseError::MalformedHeader);
        }
        let body_span = header.body_span().ok_or(ParseError::MalformedHeader)?;
        let body_end = body_span.end;
        match body_end.checked_add(TLV_INFO_SIZE) {
            Some(min_total) if min_total <= total => {}
            _ => return Err(ParseError::MalformedHeader),
        }
        let padding = image
            .get(IMAGE_HEADER_SIZE..body_span.start)
            .ok_or(ParseError::TruncatedImage)?;
        if padding.iter().any(|&byte| byte != 0) {
            return Err(ParseError::MalformedHeader);
        }
        Ok(ImageLayout {
            header,
            signed_span: 0..body_end,
            body_span,
            trailer_span: body_end..total,
        })
    }

    /// Iterates the trailer entries. Fails if the trailer info block is bad.
    pub fn tlvs(&self, image: &'a [u8]) -> Result<TlvIter<'a>, ParseError> {
        let trailer = image
            .get(self.trailer_span.clone())
            .ok_or(ParseError::TruncatedImage)?;
        let (info, entries) =
            TlvInfo::ref_from_prefix(trailer).map_err(|_| ParseError::MalformedHeader)?;
        if info.magic.get() != TLV_INFO_MAGIC || usize::from(info.tlv_total.get()) != trailer.len()
        {
            return Err(ParseError::MalformedHeader);
        }
        Ok(TlvIter::new(
            entries,
            self.trailer_span.start + TLV_INFO_SIZE,
        ))
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T) -> Result<(), ParseError> {
    match slot.replace(value) {
        Some(_) => Err(ParseError::MalformedHeader),
        None => Ok(()),
    }
}

/// Parses and bounds-checks an image.
///
/// `mandatory_tags` lists trailer tags whose absence makes the image
/// malformed. The signature entry is always required.
pub fn parse<'a>(image: &'a [u8], mandatory_tags: &[u16]) -> Result<ImageMetadata<'a>, ParseError> {
    let layout = ImageLayout::from_image(image)?;

    let mut key_id = None;
    let mut digest = None;
    let mut signature = None;
    let mut encryption = None;

    for entry in layout.tlvs(image)? {
        let entry = entry?;
        match entry.kind {
            TLV_KEY_ID => {
                let id: [u8; 4] = entry
                    .data
                    .try_into()
                    .map_err(|_| ParseError::MalformedHeader)?;
                set_once(&mut key_id, u32::from_le_bytes(id))?;
            }
            TLV_SHA384 => {
                let stored: &[u8; SHA384_DIGEST_SIZE] = entry
                    .data
                    .try_into()
                    .map_err(|_| ParseError::MalformedHeader)?;
                set_once(&mut digest, stored)?;
            }
            TLV_ECDSA_P384 => {
                if entry.data.is_empty() || entry.data.len() > MAX_SIGNATURE_SIZE {
                    return Err(ParseError::MalformedHeader);
                }
                set_once(&mut signature, entry.data)?;
            }
            tag => {
                if let Some(scheme) = EncryptionScheme::from_tlv_tag(tag) {
                    if entry.data.len() != scheme.wrapped_key_len() {
                        return Err(ParseError::MalformedHeader);
                    }
                    set_once(
                        &mut encryption,
                        EncryptionParams {
                            scheme,
                            wrapped_key: entry.data,
                        },
                    )?;
                }
                // Anything else is skipped here; mandatory tags are checked below.
            }
        }
    }

    for &tag in mandatory_tags {
        let mut entries = layout.tlvs(image)?;
        if !entries.any(|entry| matches!(entry, Ok(entry) if entry.kind == tag)) {
            return Err(ParseError::MalformedHeader);
        }
    }

    let signature = signature.ok_or(ParseError::MalformedHeader)?;
    if layout.header.is_encrypted() != encryption.is_some() {
        return Err(ParseError::MalformedHeader);
    }

    let signed = image
        .get(layout.signed_span.clone())
        .ok_or(ParseError::TruncatedImage)?;
    let body = image
        .get(layout.body_span.clone())
        .ok_or(ParseError::TruncatedImage)?;

    Ok(ImageMetadata {
        header: layout.header,
        signed,
        body,
        body_span: layout.body_span,
        trailer_span: layout.trailer_span,
        digest,
        signature,
        key_id,
        encryption,
    })
}
