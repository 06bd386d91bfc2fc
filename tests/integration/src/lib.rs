// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test_boot_flow;
#[cfg(test)]
mod test_verification;

#[cfg(test)]
mod test {
    use p384::ecdsa::SigningKey;
    use sigboot_builder::{signing_key_from_pem, ImageBuilder};
    use sigboot_emulator_keys::{test_keys, EMULATOR_KEYS, EMULATOR_POLICY};
    use sigboot_rom::rustcrypto::{EcdsaP384Verifier, Sha384Engine};
    use sigboot_rom::VerificationEngine;

    pub type EmulatorEngine = VerificationEngine<'static, Sha384Engine, EcdsaP384Verifier, 2>;

    pub static EMULATOR_ENGINE: EmulatorEngine = VerificationEngine::new(
        &EMULATOR_KEYS,
        &EMULATOR_POLICY,
        Sha384Engine,
        EcdsaP384Verifier,
    );

    pub fn vendor_key(index: usize) -> SigningKey {
        let pem = match index {
            0 => test_keys::VENDOR_0,
            1 => test_keys::VENDOR_1,
            _ => test_keys::VENDOR_2,
        };
        signing_key_from_pem(pem).unwrap()
    }

    /// Image the emulator policy accepts once signed by a trusted key.
    pub fn emulator_image(payload: &[u8]) -> ImageBuilder {
        ImageBuilder::new(payload)
            .load_addr(0x4000_0000)
            .security_counter(1)
            .digest_tlv(true)
    }
}
