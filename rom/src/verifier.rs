// Licensed under the Apache-2.0 license

//! Image verification engine.
//!
//! Verification is a fixed pipeline:
//!
//! ```text
//! parse -> digest -> select key -> check signature -> check rollback
//!       -> check encryption -> accept
//! ```
//!
//! Each stage consumes the token produced by the previous one, so no stage
//! can run out of order and an accepted image can only come out of the last
//! stage. Any failure ends the pipeline with a [`RejectReason`].

use boot_image::ImageMetadata;
use constant_time_eq::constant_time_eq;
use romtime::{HexPrefix, HexWord};
use sigboot_config::VerifyPolicy;
use sigboot_error::RejectReason;

use crate::crypto::{DigestEngine, ImageDigest, SignatureVerifier};
use crate::image_verifier::ImageVerifier;
use crate::key_store::{EncryptionKey, KeyStore};
use crate::verdict::{AcceptedImage, Verdict};

struct Parsed<'i> {
    meta: ImageMetadata<'i>,
}

struct Digested<'i> {
    meta: ImageMetadata<'i>,
    digest: ImageDigest,
}

enum Candidates {
    /// The image named its key; only that key is tried.
    Declared(usize),
    /// Every key, in table order.
    All,
}

struct KeySelected<'i> {
    meta: ImageMetadata<'i>,
    digest: ImageDigest,
    candidates: Candidates,
}

struct SignatureChecked<'i> {
    meta: ImageMetadata<'i>,
    digest: ImageDigest,
    key_index: usize,
}

struct RollbackChecked<'i> {
    meta: ImageMetadata<'i>,
    digest: ImageDigest,
    key_index: usize,
}

/// An image whose signature, security counter and encryption parameters
/// have all been checked.
#[derive(Clone, Debug)]
pub struct AuthenticatedImage<'i> {
    meta: ImageMetadata<'i>,
    digest: ImageDigest,
    key_index: usize,
    encryption_key: Option<EncryptionKey<'i>>,
}

impl<'i> AuthenticatedImage<'i> {
    pub fn metadata(&self) -> &ImageMetadata<'i> {
        &self.meta
    }

    /// Payload bytes as stored in the image; ciphertext for encrypted images.
    pub fn body(&self) -> &'i [u8] {
        self.meta.body
    }

    pub fn digest(&self) -> &ImageDigest {
        &self.digest
    }

    pub fn key_index(&self) -> usize {
        self.key_index
    }

    /// Key to unwrap the payload key with. Set for encrypted images only.
    pub fn encryption_key(&self) -> Option<&EncryptionKey<'i>> {
        self.encryption_key.as_ref()
    }

    pub fn accepted(&self) -> AcceptedImage {
        AcceptedImage::new(
            self.key_index,
            self.meta.encryption.is_some(),
            self.meta.header.security_counter.get(),
            self.meta.body.len(),
        )
    }
}

pub struct VerificationEngine<'a, D, S, const N: usize> {
    keys: &'a KeyStore<'a, N>,
    policy: &'a VerifyPolicy<'a>,
    digest_engine: D,
    signature_verifier: S,
}

impl<'a, D, S, const N: usize> VerificationEngine<'a, D, S, N>
where
    D: DigestEngine,
    S: SignatureVerifier,
{
    pub const fn new(
        keys: &'a KeyStore<'a, N>,
        policy: &'a VerifyPolicy<'a>,
        digest_engine: D,
        signature_verifier: S,
    ) -> Self {
        VerificationEngine {
            keys,
            policy,
            digest_engine,
            signature_verifier,
        }
    }

    pub fn keys(&self) -> &'a KeyStore<'a, N> {
        self.keys
    }

    /// Runs every check and returns the authenticated image, or the first
    /// reason the image was rejected.
    pub fn authenticate<'i>(
        &'i self,
        image: &'i [u8],
    ) -> Result<AuthenticatedImage<'i>, RejectReason> {
        let result = self
            .parse(image)
            .and_then(|parsed| self.digest(parsed))
            .and_then(|digested| self.select_key(digested))
            .and_then(|selected| self.check_signature(selected))
            .and_then(|checked| self.check_rollback(checked))
            .and_then(|checked| self.check_encryption(checked));
        match &result {
            Ok(authenticated) => romtime::println!(
                "[sigboot] Image {} accepted with key {}, digest {}",
                authenticated.meta.header.image_version,
                authenticated.key_index,
                HexPrefix::<8>(&authenticated.digest)
            ),
            Err(reason) => romtime::println!(
                "[sigboot] Image rejected: {} ({})",
                reason,
                HexWord(reason.code())
            ),
        }
        result
    }

    pub fn verify(&self, image: &[u8]) -> Verdict {
        self.authenticate(image)
            .map(|authenticated| authenticated.accepted())
            .into()
    }

    fn parse<'i>(&self, image: &'i [u8]) -> Result<Parsed<'i>, RejectReason> {
        let meta = boot_image::parse(image, self.policy.mandatory_tags)?;
        Ok(Parsed { meta })
    }

    fn digest<'i>(&self, parsed: Parsed<'i>) -> Result<Digested<'i>, RejectReason> {
        let digest = self
            .digest_engine
            .digest(parsed.meta.signed)
            .map_err(|_| RejectReason::DigestFailure)?;
        Ok(Digested {
            meta: parsed.meta,
            digest,
        })
    }

    fn select_key<'i>(&self, digested: Digested<'i>) -> Result<KeySelected<'i>, RejectReason> {
        let candidates = match digested.meta.key_id {
            Some(key_id) => {
                let (index, _) = self
                    .keys
                    .find_by_key_id(key_id)
                    .ok_or(RejectReason::UnknownKey)?;
                Candidates::Declared(index)
            }
            None => Candidates::All,
        };
        Ok(KeySelected {
            meta: digested.meta,
            digest: digested.digest,
            candidates,
        })
    }

    fn check_signature<'i>(
        &self,
        selected: KeySelected<'i>,
    ) -> Result<SignatureChecked<'i>, RejectReason> {
        let KeySelected {
            meta,
            digest,
            candidates,
        } = selected;

        if let Some(stored) = meta.digest {
            if !constant_time_eq(stored, &digest) {
                return Err(RejectReason::DigestMismatch);
            }
        }

        let verifies = |public_key: &[u8]| {
            self.signature_verifier
                .verify(&digest, meta.signature, public_key)
        };
        let key_index = match candidates {
            Candidates::Declared(index) => {
                let key = self
                    .keys
                    .key_at(index)
                    .map_err(|_| RejectReason::BadSignature)?;
                if !verifies(key.public_key()) {
                    return Err(RejectReason::BadSignature);
                }
                index
            }
            Candidates::All => self
                .keys
                .iter()
                .find(|(_, key)| verifies(key.public_key()))
                .map(|(index, _)| index)
                .ok_or(RejectReason::BadSignature)?,
        };

        Ok(SignatureChecked {
            meta,
            digest,
            key_index,
        })
    }

    fn check_rollback<'i>(
        &self,
        checked: SignatureChecked<'i>,
    ) -> Result<RollbackChecked<'i>, RejectReason> {
        let image = checked.meta.header.security_counter.get();
        let minimum = self.policy.min_security_counter;
        if image < minimum {
            return Err(RejectReason::SecurityCounterTooLow { image, minimum });
        }
        Ok(RollbackChecked {
            meta: checked.meta,
            digest: checked.digest,
            key_index: checked.key_index,
        })
    }

    fn check_encryption<'i>(
        &'i self,
        checked: RollbackChecked<'i>,
    ) -> Result<AuthenticatedImage<'i>, RejectReason> {
        let encryption_key = match checked.meta.encryption {
            None if self.policy.require_encryption => {
                return Err(RejectReason::EncryptionRequired)
            }
            None => None,
            Some(params) => {
                let key = self
                    .keys
                    .encryption_key()
                    .ok_or(RejectReason::EncryptionKeyMissing)?;
                if key.scheme() != params.scheme || !key.is_well_formed() {
                    return Err(RejectReason::EncryptionSchemeMismatch);
                }
                Some(*key)
            }
        };
        Ok(AuthenticatedImage {
            meta: checked.meta,
            digest: checked.digest,
            key_index: checked.key_index,
            encryption_key,
        })
    }
}

impl<D, S, const N: usize> ImageVerifier for VerificationEngine<'_, D, S, N>
where
    D: DigestEngine,
    S: SignatureVerifier,
{
    fn authenticate<'i>(&'i self, image: &'i [u8]) -> Result<AuthenticatedImage<'i>, RejectReason> {
        VerificationEngine::authenticate(self, image)
    }
}
