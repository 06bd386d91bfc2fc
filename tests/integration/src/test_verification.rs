// Licensed under the Apache-2.0 license

use crate::test::{emulator_image, vendor_key, EMULATOR_ENGINE};
use boot_image::parse;
use sigboot_builder::public_key_bytes;
use sigboot_config::VerifyPolicy;
use sigboot_emulator_keys::{VENDOR_KEY_0_ID, VENDOR_KEY_1_ID};
use sigboot_error::{ParseError, RejectReason};
use sigboot_rom::rustcrypto::{EcdsaP384Verifier, Sha384Engine};
use sigboot_rom::{KeyRecord, KeyStore, Verdict, VerificationEngine};

#[test]
fn test_trusted_keys_accepted() {
    for (index, key_id) in [(0, VENDOR_KEY_0_ID), (1, VENDOR_KEY_1_ID)] {
        let image = emulator_image(b"vendor firmware")
            .key_id(key_id)
            .sign(&vendor_key(index))
            .unwrap();
        let verdict = EMULATOR_ENGINE.verify(&image);
        assert_eq!(verdict.accepted().unwrap().key_index(), index);
    }
}

#[test]
fn test_second_key_selected_without_key_id() {
    let image = emulator_image(b"vendor firmware")
        .sign(&vendor_key(1))
        .unwrap();
    let verdict = EMULATOR_ENGINE.verify(&image);
    assert_eq!(verdict.accepted().unwrap().key_index(), 1);
}

#[test]
fn test_untrusted_key_rejected() {
    let image = emulator_image(b"vendor firmware")
        .sign(&vendor_key(2))
        .unwrap();
    assert_eq!(
        EMULATOR_ENGINE.verify(&image),
        Verdict::Reject(RejectReason::BadSignature)
    );

    // Claiming a trusted key id does not help.
    let image = emulator_image(b"vendor firmware")
        .key_id(VENDOR_KEY_0_ID)
        .sign(&vendor_key(2))
        .unwrap();
    assert_eq!(
        EMULATOR_ENGINE.verify(&image),
        Verdict::Reject(RejectReason::BadSignature)
    );
}

#[test]
fn test_unknown_key_id() {
    for signer in [0, 2] {
        let image = emulator_image(b"vendor firmware")
            .key_id(0x77)
            .sign(&vendor_key(signer))
            .unwrap();
        assert_eq!(
            EMULATOR_ENGINE.verify(&image),
            Verdict::Reject(RejectReason::UnknownKey)
        );
    }
}

#[test]
fn test_signature_corruption() {
    let image = emulator_image(b"vendor firmware")
        .key_id(VENDOR_KEY_0_ID)
        .sign(&vendor_key(0))
        .unwrap();
    let signature_start = parse(&image, &[]).unwrap().trailer_span.end - 96;

    // One bit in every byte of r and s.
    for byte in 0..96 {
        let mut corrupted = image.clone();
        corrupted[signature_start + byte] ^= 1 << (byte % 8);
        assert_eq!(
            EMULATOR_ENGINE.verify(&corrupted),
            Verdict::Reject(RejectReason::BadSignature),
            "signature byte {byte}"
        );
    }
}

#[test]
fn test_signed_span_tampering() {
    let image = emulator_image(b"vendor firmware")
        .sign(&vendor_key(0))
        .unwrap();
    let meta = parse(&image, &[]).unwrap();

    // Payload: caught by the recorded digest.
    let mut tampered = image.clone();
    tampered[meta.body_span.start] ^= 0x01;
    assert_eq!(
        EMULATOR_ENGINE.verify(&tampered),
        Verdict::Reject(RejectReason::DigestMismatch)
    );

    // Security counter in the header.
    let mut tampered = image.clone();
    tampered[32] ^= 0x01;
    assert_eq!(
        EMULATOR_ENGINE.verify(&tampered),
        Verdict::Reject(RejectReason::DigestMismatch)
    );
}

#[test]
fn test_missing_digest_tlv_rejected_by_policy() {
    let image = emulator_image(b"vendor firmware")
        .digest_tlv(false)
        .sign(&vendor_key(0))
        .unwrap();
    assert_eq!(
        EMULATOR_ENGINE.verify(&image),
        Verdict::Reject(RejectReason::Parse(ParseError::MalformedHeader))
    );

    let engine = VerificationEngine::new(
        EMULATOR_ENGINE.keys(),
        &VerifyPolicy::DEFAULT,
        Sha384Engine,
        EcdsaP384Verifier,
    );
    assert!(engine.verify(&image).is_accept());
}

#[test]
fn test_length_boundary() {
    let image = emulator_image(b"vendor firmware")
        .sign(&vendor_key(0))
        .unwrap();
    assert!(EMULATOR_ENGINE.verify(&image).is_accept());
    assert_eq!(
        EMULATOR_ENGINE.verify(&image[..image.len() - 1]),
        Verdict::Reject(RejectReason::Parse(ParseError::TruncatedImage))
    );

    let mut erased = image.clone();
    erased.resize(image.len() + 4096, 0xff);
    assert!(EMULATOR_ENGINE.verify(&erased).is_accept());
}

#[test]
fn test_rollback_floor() {
    let keys = EMULATOR_ENGINE.keys();
    let policy = VerifyPolicy::new(false, &[], 5);
    let engine = VerificationEngine::new(keys, &policy, Sha384Engine, EcdsaP384Verifier);

    let old = emulator_image(b"old firmware")
        .security_counter(4)
        .sign(&vendor_key(0))
        .unwrap();
    assert_eq!(
        engine.verify(&old),
        Verdict::Reject(RejectReason::SecurityCounterTooLow {
            image: 4,
            minimum: 5
        })
    );

    let current = emulator_image(b"new firmware")
        .security_counter(5)
        .sign(&vendor_key(0))
        .unwrap();
    assert!(engine.verify(&current).is_accept());
}

#[test]
fn test_key_position_in_table() {
    let signer = vendor_key(1);
    let trusted = public_key_bytes(&signer);
    let other = public_key_bytes(&vendor_key(0));
    let untrusted = public_key_bytes(&vendor_key(2));
    let image = emulator_image(b"vendor firmware").sign(&signer).unwrap();

    let store = KeyStore::new(
        [
            KeyRecord::new(&untrusted),
            KeyRecord::new(&other),
            KeyRecord::new(&trusted),
        ],
        None,
    );
    let engine = VerificationEngine::new(
        &store,
        &VerifyPolicy::DEFAULT,
        Sha384Engine,
        EcdsaP384Verifier,
    );
    assert_eq!(engine.verify(&image).accepted().unwrap().key_index(), 2);

    let store = KeyStore::new([KeyRecord::new(&untrusted), KeyRecord::new(&other)], None);
    let engine = VerificationEngine::new(
        &store,
        &VerifyPolicy::DEFAULT,
        Sha384Engine,
        EcdsaP384Verifier,
    );
    assert_eq!(
        engine.verify(&image),
        Verdict::Reject(RejectReason::BadSignature)
    );
}

#[test]
fn test_verdict_is_stable() {
    let good = emulator_image(b"vendor firmware")
        .sign(&vendor_key(0))
        .unwrap();
    let bad = emulator_image(b"vendor firmware")
        .sign(&vendor_key(2))
        .unwrap();
    for image in [&good, &bad] {
        let first = EMULATOR_ENGINE.verify(image);
        assert_eq!(first, EMULATOR_ENGINE.verify(image));
        assert_eq!(first.code(), EMULATOR_ENGINE.verify(image).code());
    }
}
