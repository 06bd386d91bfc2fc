// Licensed under the Apache-2.0 license

#![cfg_attr(target_arch = "riscv32", no_std)]

/// Verification policy fixed when the bootloader is built.
///
/// Platforms declare one of these as a `static` next to their key table and
/// hand it to the verification engine. Nothing mutates it at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifyPolicy<'a> {
    /// Reject images that are not encrypted.
    pub require_encryption: bool,
    /// Trailer tags that must be present. An unknown tag listed here is no
    /// longer skippable: its absence makes the image malformed.
    pub mandatory_tags: &'a [u16],
    /// Lowest security counter an image may carry (anti-rollback).
    pub min_security_counter: u32,
}

impl VerifyPolicy<'static> {
    /// Signature only: no encryption requirement, no extra tags, no rollback floor.
    pub const DEFAULT: VerifyPolicy<'static> = VerifyPolicy {
        require_encryption: false,
        mandatory_tags: &[],
        min_security_counter: 0,
    };
}

impl<'a> VerifyPolicy<'a> {
    pub const fn new(
        require_encryption: bool,
        mandatory_tags: &'a [u16],
        min_security_counter: u32,
    ) -> Self {
        VerifyPolicy {
            require_encryption,
            mandatory_tags,
            min_security_counter,
        }
    }
}

impl Default for VerifyPolicy<'static> {
    fn default() -> Self {
        Self::DEFAULT
    }
}
