// Licensed under the Apache-2.0 license

//! Error taxonomy shared by the image parser, the key store and the
//! verification engine.
//!
//! Every failure the engine can observe ends up as a [`RejectReason`]. Each
//! reason has a stable numeric code that boot flows report through their
//! status or fatal-error paths.

#![cfg_attr(target_arch = "riscv32", no_std)]

use thiserror::Error;

/// Base of the numeric code space used by this crate.
pub const SIGBOOT_ERROR_BASE: u32 = 0x5B00_0000;

/// Structural problems found while walking an image header and trailer.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed image header or trailer")]
    MalformedHeader,
    #[error("image is truncated")]
    TruncatedImage,
    #[error("unsupported image header version")]
    UnsupportedVersion,
}

impl ParseError {
    pub const fn code(self) -> u32 {
        match self {
            ParseError::MalformedHeader => SIGBOOT_ERROR_BASE | 0x0101,
            ParseError::TruncatedImage => SIGBOOT_ERROR_BASE | 0x0102,
            ParseError::UnsupportedVersion => SIGBOOT_ERROR_BASE | 0x0103,
        }
    }
}

/// Misuse of the key store API.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyStoreError {
    #[error("key index {index} out of range (key count {count})")]
    IndexOutOfRange { index: usize, count: usize },
}

impl KeyStoreError {
    pub const fn code(self) -> u32 {
        match self {
            KeyStoreError::IndexOutOfRange { .. } => SIGBOOT_ERROR_BASE | 0x0201,
        }
    }
}

/// Failure reported by a digest, signature or decryption capability.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("crypto engine failure")]
    EngineFailure,
    #[error("invalid crypto input: {0}")]
    InvalidInput(&'static str),
    #[error("output buffer too small")]
    BufferTooSmall,
}

impl CryptoError {
    pub const fn code(self) -> u32 {
        match self {
            CryptoError::EngineFailure => SIGBOOT_ERROR_BASE | 0x0301,
            CryptoError::InvalidInput(_) => SIGBOOT_ERROR_BASE | 0x0302,
            CryptoError::BufferTooSmall => SIGBOOT_ERROR_BASE | 0x0303,
        }
    }
}

/// Why an image was rejected.
///
/// The reason is diagnostic only. Boot flows must treat every variant the
/// same way: the image is not executed.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    #[error("image parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("digest engine failure")]
    DigestFailure,
    #[error("declared key id is not in the key store")]
    UnknownKey,
    #[error("image digest does not match the digest recorded in the trailer")]
    DigestMismatch,
    #[error("signature verification failed")]
    BadSignature,
    #[error("image security counter {image} is below the minimum {minimum}")]
    SecurityCounterTooLow { image: u32, minimum: u32 },
    #[error("policy requires an encrypted image")]
    EncryptionRequired,
    #[error("image is encrypted but no encryption key is configured")]
    EncryptionKeyMissing,
    #[error("image encryption scheme does not match the configured key")]
    EncryptionSchemeMismatch,
}

impl RejectReason {
    /// Stable numeric code for boot status and fatal error reporting.
    pub const fn code(self) -> u32 {
        match self {
            RejectReason::Parse(err) => err.code(),
            RejectReason::DigestFailure => SIGBOOT_ERROR_BASE | 0x0401,
            RejectReason::UnknownKey => SIGBOOT_ERROR_BASE | 0x0402,
            RejectReason::DigestMismatch => SIGBOOT_ERROR_BASE | 0x0403,
            RejectReason::BadSignature => SIGBOOT_ERROR_BASE | 0x0404,
            RejectReason::SecurityCounterTooLow { .. } => SIGBOOT_ERROR_BASE | 0x0405,
            RejectReason::EncryptionRequired => SIGBOOT_ERROR_BASE | 0x0406,
            RejectReason::EncryptionKeyMissing => SIGBOOT_ERROR_BASE | 0x0407,
            RejectReason::EncryptionSchemeMismatch => SIGBOOT_ERROR_BASE | 0x0408,
        }
    }
}
