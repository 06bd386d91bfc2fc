// Licensed under the Apache-2.0 license

use sigboot_error::RejectReason;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Accept,
    Reject,
}

/// Summary of an image that passed every check.
///
/// Only the verification engine can build one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcceptedImage {
    key_index: usize,
    encrypted: bool,
    security_counter: u32,
    payload_len: usize,
}

impl AcceptedImage {
    pub(crate) fn new(
        key_index: usize,
        encrypted: bool,
        security_counter: u32,
        payload_len: usize,
    ) -> Self {
        AcceptedImage {
            key_index,
            encrypted,
            security_counter,
            payload_len,
        }
    }

    /// Index in the key store of the key that validated the signature.
    pub fn key_index(&self) -> usize {
        self.key_index
    }

    pub fn encrypted(&self) -> bool {
        self.encrypted
    }

    pub fn security_counter(&self) -> u32 {
        self.security_counter
    }

    pub fn payload_len(&self) -> usize {
        self.payload_len
    }
}

/// Final accept or reject decision for one image.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accept(AcceptedImage),
    Reject(RejectReason),
}

impl Verdict {
    pub fn outcome(&self) -> Outcome {
        match self {
            Verdict::Accept(_) => Outcome::Accept,
            Verdict::Reject(_) => Outcome::Reject,
        }
    }

    pub fn is_accept(&self) -> bool {
        self.outcome() == Outcome::Accept
    }

    /// `None` for accepted images.
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Verdict::Accept(_) => None,
            Verdict::Reject(reason) => Some(*reason),
        }
    }

    pub fn accepted(&self) -> Option<&AcceptedImage> {
        match self {
            Verdict::Accept(accepted) => Some(accepted),
            Verdict::Reject(_) => None,
        }
    }

    /// Status code for boot reporting. Zero means accepted.
    pub fn code(&self) -> u32 {
        self.reason().map_or(0, RejectReason::code)
    }
}

impl From<Result<AcceptedImage, RejectReason>> for Verdict {
    fn from(result: Result<AcceptedImage, RejectReason>) -> Self {
        match result {
            Ok(accepted) => Verdict::Accept(accepted),
            Err(reason) => Verdict::Reject(reason),
        }
    }
}
