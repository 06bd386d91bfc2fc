// Licensed under the Apache-2.0 license

use sigboot_error::RejectReason;

use crate::verdict::Verdict;
use crate::verifier::AuthenticatedImage;

/// Decides whether an image may be booted.
///
/// Boot flows hold a `&dyn ImageVerifier` so that platforms can wrap the
/// engine with their own checks.
///
/// Parameters:
///   image:  Raw image bytes, exactly as loaded from storage
///
/// Returns:
///   The authenticated image if every required check passes, otherwise
///   the first reason for rejection.
pub trait ImageVerifier {
    fn authenticate<'i>(&'i self, image: &'i [u8]) -> Result<AuthenticatedImage<'i>, RejectReason>;

    fn verify_image(&self, image: &[u8]) -> Verdict {
        self.authenticate(image)
            .map(|authenticated| authenticated.accepted())
            .into()
    }
}
