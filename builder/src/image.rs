// Licensed under the Apache-2.0 license

use anyhow::{bail, ensure, Context, Result};
use boot_image::{
    EncryptionScheme, ImageHeader, ImageVersion, TlvEntryHeader, TlvInfo, HEADER_VERSION,
    IMAGE_F_ENCRYPTED, IMAGE_HEADER_SIZE, IMAGE_MAGIC, MAX_SIGNATURE_SIZE, SHA384_DIGEST_SIZE,
    TLV_ECDSA_P384, TLV_ENTRY_HEADER_SIZE, TLV_INFO_MAGIC, TLV_INFO_SIZE, TLV_KEY_ID, TLV_SHA384,
};
use zerocopy::IntoBytes;

use crate::sha384;

/// Produces the signature TLV for an image.
///
/// The signature length must be known before signing because it feeds into
/// `total_size`, which is part of the signed header.
pub trait ImageSigner {
    fn signature_len(&self) -> usize;

    /// Signs the SHA-384 digest of the signed span.
    fn sign(&self, digest: &[u8; SHA384_DIGEST_SIZE]) -> Result<Vec<u8>>;
}

/// Assembles a boot image: header, payload and TLV trailer.
///
/// The payload is taken as-is. For encrypted images it must already be the
/// ciphertext; the signature covers the ciphertext.
#[derive(Clone, Debug)]
pub struct ImageBuilder {
    payload: Vec<u8>,
    header_size: u16,
    load_addr: u32,
    version: ImageVersion,
    security_counter: u32,
    key_id: Option<u32>,
    digest_tlv: bool,
    encryption: Option<(EncryptionScheme, Vec<u8>)>,
    tlvs: Vec<(u16, Vec<u8>)>,
}

impl ImageBuilder {
    pub fn new(payload: &[u8]) -> Self {
        ImageBuilder {
            payload: payload.to_vec(),
            header_size: IMAGE_HEADER_SIZE as u16,
            load_addr: 0,
            version: ImageVersion::default(),
            security_counter: 0,
            key_id: None,
            digest_tlv: false,
            encryption: None,
            tlvs: Vec::new(),
        }
    }

    /// Header size including padding. Must be at least the fixed header.
    pub fn header_size(mut self, header_size: u16) -> Self {
        self.header_size = header_size;
        self
    }

    pub fn load_addr(mut self, load_addr: u32) -> Self {
        self.load_addr = load_addr;
        self
    }

    pub fn version(mut self, version: ImageVersion) -> Self {
        self.version = version;
        self
    }

    pub fn security_counter(mut self, security_counter: u32) -> Self {
        self.security_counter = security_counter;
        self
    }

    pub fn key_id(mut self, key_id: u32) -> Self {
        self.key_id = Some(key_id);
        self
    }

    /// Also record the SHA-384 of the signed span in the trailer.
    pub fn digest_tlv(mut self, enable: bool) -> Self {
        self.digest_tlv = enable;
        self
    }

    /// Marks the payload as encrypted and records the wrapped payload key.
    pub fn encrypted(mut self, scheme: EncryptionScheme, wrapped_key: &[u8]) -> Self {
        self.encryption = Some((scheme, wrapped_key.to_vec()));
        self
    }

    /// Appends an extra trailer entry, placed before the signature.
    pub fn tlv(mut self, kind: u16, data: &[u8]) -> Self {
        self.tlvs.push((kind, data.to_vec()));
        self
    }

    fn header(&self, total_size: usize) -> Result<ImageHeader> {
        let flags = if self.encryption.is_some() {
            IMAGE_F_ENCRYPTED
        } else {
            0
        };
        Ok(ImageHeader {
            magic: IMAGE_MAGIC.into(),
            header_version: HEADER_VERSION.into(),
            header_size: self.header_size.into(),
            payload_size: u32::try_from(self.payload.len())
                .context("Payload too large")?
                .into(),
            total_size: u32::try_from(total_size).context("Image too large")?.into(),
            flags: flags.into(),
            load_addr: self.load_addr.into(),
            image_version: self.version,
            security_counter: self.security_counter.into(),
        })
    }

    /// Builds the image and signs it with `signer`.
    pub fn sign(&self, signer: &dyn ImageSigner) -> Result<Vec<u8>> {
        ensure!(!self.payload.is_empty(), "Payload must not be empty");
        ensure!(
            usize::from(self.header_size) >= IMAGE_HEADER_SIZE,
            "Header size {} is smaller than the {} byte header",
            self.header_size,
            IMAGE_HEADER_SIZE
        );
        let signature_len = signer.signature_len();
        if signature_len == 0 || signature_len > MAX_SIGNATURE_SIZE {
            bail!("Unsupported signature length {}", signature_len);
        }
        if let Some((scheme, wrapped_key)) = &self.encryption {
            ensure!(
                wrapped_key.len() == scheme.wrapped_key_len(),
                "Wrapped key for {:?} must be {} bytes, got {}",
                scheme,
                scheme.wrapped_key_len(),
                wrapped_key.len()
            );
        }

        let mut entry_lens = Vec::new();
        if self.key_id.is_some() {
            entry_lens.push(4);
        }
        if self.digest_tlv {
            entry_lens.push(SHA384_DIGEST_SIZE);
        }
        if let Some((_, wrapped_key)) = &self.encryption {
            entry_lens.push(wrapped_key.len());
        }
        entry_lens.extend(self.tlvs.iter().map(|(_, data)| data.len()));
        entry_lens.push(signature_len);

        let tlv_total = TLV_INFO_SIZE
            + entry_lens
                .iter()
                .map(|len| TLV_ENTRY_HEADER_SIZE + len)
                .sum::<usize>();
        let tlv_total = u16::try_from(tlv_total).context("Trailer too large")?;
        let total_size =
            usize::from(self.header_size) + self.payload.len() + usize::from(tlv_total);

        let header = self.header(total_size)?;
        let mut image = header.as_bytes().to_vec();
        image.resize(usize::from(self.header_size), 0);
        image.extend_from_slice(&self.payload);

        let signed_len = header.signed_len().context("Signed span overflows")?;
        ensure!(image.len() == signed_len, "Signed span mismatch");
        let digest = sha384(&image);
        let signature = signer.sign(&digest)?;
        ensure!(
            signature.len() == signature_len,
            "Signer produced {} bytes, declared {}",
            signature.len(),
            signature_len
        );

        let info = TlvInfo {
            magic: TLV_INFO_MAGIC.into(),
            tlv_total: tlv_total.into(),
        };
        image.extend_from_slice(info.as_bytes());
        if let Some(key_id) = self.key_id {
            push_tlv(&mut image, TLV_KEY_ID, &key_id.to_le_bytes());
        }
        if self.digest_tlv {
            push_tlv(&mut image, TLV_SHA384, &digest);
        }
        if let Some((scheme, wrapped_key)) = &self.encryption {
            push_tlv(&mut image, scheme.tlv_tag(), wrapped_key);
        }
        for (kind, data) in &self.tlvs {
            push_tlv(&mut image, *kind, data);
        }
        push_tlv(&mut image, TLV_ECDSA_P384, &signature);

        ensure!(image.len() == total_size, "Image size mismatch");
        Ok(image)
    }
}

fn push_tlv(image: &mut Vec<u8>, kind: u16, data: &[u8]) {
    let header = TlvEntryHeader {
        kind: kind.into(),
        len: (data.len() as u16).into(),
    };
    image.extend_from_slice(header.as_bytes());
    image.extend_from_slice(data);
}
