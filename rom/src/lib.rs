/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Image verification and key management core for the boot ROM.

--*/

#![cfg_attr(target_arch = "riscv32", no_std)]

pub mod boot;
pub use boot::{boot_candidate, boot_or_halt, BootError, BootImage};
pub mod crypto;
pub use crypto::{Decryptor, DigestEngine, ImageDigest, SignatureVerifier};
pub mod flash;
pub use flash::*;
pub mod image_loader;
pub use image_loader::{load_image, LoadError};
pub mod image_verifier;
pub use image_verifier::ImageVerifier;
pub mod key_store;
pub use key_store::{EncryptionKey, KeyRecord, KeyStore};
#[cfg(feature = "rustcrypto")]
pub mod rustcrypto;
mod verdict;
pub use verdict::{AcceptedImage, Outcome, Verdict};
mod verifier;
pub use verifier::{AuthenticatedImage, VerificationEngine};

pub trait FatalErrorHandler {
    fn fatal_error(&mut self, code: u32) -> !;
}

static mut FATAL_ERROR_HANDLER: Option<&'static mut dyn FatalErrorHandler> = None;

/// Set the fatal error handler.
///
/// SAFETY: the handler must not be used anywhere else once installed. Install
/// it once, early in boot, before any image is verified.
pub fn set_fatal_error_handler(handler: &'static mut dyn FatalErrorHandler) {
    unsafe {
        FATAL_ERROR_HANDLER = Some(handler);
    }
}

#[inline(never)]
#[allow(clippy::empty_loop)]
pub fn fatal_error(code: u32) -> ! {
    romtime::println!("[sigboot] Fatal error {}", romtime::HexWord(code));
    #[allow(static_mut_refs)]
    if let Some(handler) = unsafe { FATAL_ERROR_HANDLER.as_mut() } {
        handler.fatal_error(code);
    } else {
        // No handler: never hand control to an unverified image.
        loop {}
    }
}
