// Licensed under the Apache-2.0 license

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use boot_image::{
    EncryptionScheme, ImageLayout, ImageVersion, IMAGE_HEADER_SIZE, TLV_ECDSA_P384, TLV_ENC_KW128,
    TLV_ENC_KW256, TLV_KEY_ID, TLV_SHA384,
};
use clap::{Args, ValueEnum};
use clap_num::maybe_hex;
use log::info;
use sigboot_builder::{load_public_key, load_signing_key, read_image, write_image, ImageBuilder};
use sigboot_config::VerifyPolicy;
use sigboot_rom::rustcrypto::{EcdsaP384Verifier, Sha384Engine};
use sigboot_rom::{EncryptionKey, KeyRecord, KeyStore, VerificationEngine, Verdict};

use crate::policy::PolicyFile;

/// Largest key table `image-verify` builds.
const MAX_PUBKEYS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Scheme {
    AesKw128,
    AesKw256,
}

impl From<Scheme> for EncryptionScheme {
    fn from(scheme: Scheme) -> Self {
        match scheme {
            Scheme::AesKw128 => EncryptionScheme::AesKw128,
            Scheme::AesKw256 => EncryptionScheme::AesKw256,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct SignArgs {
    /// Payload file; for encrypted images, the ciphertext
    #[arg(long, value_name = "FILE")]
    pub payload: PathBuf,

    /// PKCS#8 PEM P-384 signing key
    #[arg(long, value_name = "PEM")]
    pub key: PathBuf,

    /// Output image file
    #[arg(long, value_name = "FILE")]
    pub output: PathBuf,

    /// Key id recorded in the trailer
    #[arg(long, value_parser = maybe_hex::<u32>)]
    pub key_id: Option<u32>,

    #[arg(long, value_parser = maybe_hex::<u32>, default_value_t = 0)]
    pub load_addr: u32,

    /// Version as MAJOR.MINOR.REVISION[+BUILD]
    #[arg(long, value_parser = parse_version, default_value = "0.0.0")]
    pub image_version: ImageVersion,

    #[arg(long, default_value_t = 0)]
    pub security_counter: u32,

    /// Header size including padding
    #[arg(long, value_parser = maybe_hex::<u16>, default_value_t = IMAGE_HEADER_SIZE as u16)]
    pub header_size: u16,

    /// Record the SHA-384 of the signed span in the trailer
    #[arg(long, default_value_t = false)]
    pub digest: bool,

    /// Key-wrap scheme of an encrypted payload
    #[arg(long, value_enum, requires = "wrapped_key")]
    pub enc_scheme: Option<Scheme>,

    /// Wrapped payload key, in hex
    #[arg(long, requires = "enc_scheme")]
    pub wrapped_key: Option<String>,
}

#[derive(Clone, Debug)]
pub(crate) struct PubkeyArg {
    pub path: PathBuf,
    pub key_id: Option<u32>,
}

#[derive(Args, Debug)]
pub(crate) struct VerifyArgs {
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Trusted public key (SEC1 or PEM), optionally followed by its key id
    #[arg(
        long = "pubkey",
        value_name = "FILE[,KEY_ID]",
        value_parser = parse_pubkey,
        required = true
    )]
    pub pubkeys: Vec<PubkeyArg>,

    /// TOML verification policy
    #[arg(long, value_name = "TOML")]
    pub policy: Option<PathBuf>,

    /// Raw key-encryption key
    #[arg(long, value_name = "FILE", requires = "enc_scheme")]
    pub enc_key: Option<PathBuf>,

    /// Scheme of the key-encryption key
    #[arg(long, value_enum, requires = "enc_key")]
    pub enc_scheme: Option<Scheme>,
}

#[derive(Args, Debug)]
pub(crate) struct InfoArgs {
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,
}

fn parse_version(s: &str) -> Result<ImageVersion, String> {
    let (triple, build) = match s.split_once('+') {
        Some((triple, build)) => (triple, build.parse::<u32>().map_err(|e| e.to_string())?),
        None => (s, 0),
    };
    let parts: Vec<&str> = triple.split('.').collect();
    let [major, minor, revision] = parts.as_slice() else {
        return Err(format!("expected MAJOR.MINOR.REVISION[+BUILD], got '{s}'"));
    };
    Ok(ImageVersion::new(
        major.parse().map_err(|e| format!("major: {e}"))?,
        minor.parse().map_err(|e| format!("minor: {e}"))?,
        revision.parse().map_err(|e| format!("revision: {e}"))?,
        build,
    ))
}

fn parse_pubkey(s: &str) -> Result<PubkeyArg, String> {
    match s.split_once(',') {
        Some((path, key_id)) => Ok(PubkeyArg {
            path: path.into(),
            key_id: Some(maybe_hex::<u32>(key_id)?),
        }),
        None => Ok(PubkeyArg {
            path: s.into(),
            key_id: None,
        }),
    }
}

pub(crate) fn sign(args: &SignArgs) -> Result<()> {
    let payload = std::fs::read(&args.payload)
        .with_context(|| format!("Cannot read payload '{}'", args.payload.display()))?;
    let key = load_signing_key(&args.key)?;

    let mut builder = ImageBuilder::new(&payload)
        .header_size(args.header_size)
        .load_addr(args.load_addr)
        .version(args.image_version)
        .security_counter(args.security_counter)
        .digest_tlv(args.digest);
    if let Some(key_id) = args.key_id {
        builder = builder.key_id(key_id);
    }
    if let Some(scheme) = args.enc_scheme {
        let wrapped_key = args
            .wrapped_key
            .as_deref()
            .context("--wrapped-key is required for encrypted images")?;
        let wrapped_key = hex::decode(wrapped_key).context("Invalid --wrapped-key hex")?;
        builder = builder.encrypted(scheme.into(), &wrapped_key);
    }

    let image = builder.sign(&key)?;
    write_image(&args.output, &image)?;
    info!(
        "Wrote {} byte image {} to {}",
        image.len(),
        args.image_version,
        args.output.display()
    );
    Ok(())
}

pub(crate) fn verify(args: &VerifyArgs) -> Result<()> {
    match verify_image(args)? {
        Verdict::Accept(accepted) => {
            info!(
                "Image accepted: key index {}, security counter {}, {} byte {} payload",
                accepted.key_index(),
                accepted.security_counter(),
                accepted.payload_len(),
                if accepted.encrypted() {
                    "encrypted"
                } else {
                    "plain"
                }
            );
            Ok(())
        }
        Verdict::Reject(reason) => bail!("Image rejected: {} ({:#010x})", reason, reason.code()),
    }
}

pub(crate) fn verify_image(args: &VerifyArgs) -> Result<Verdict> {
    let image = read_image(&args.image)?;
    let keys = args
        .pubkeys
        .iter()
        .map(|pubkey| load_public_key(&pubkey.path))
        .collect::<Result<Vec<_>>>()?;
    let records: Vec<KeyRecord> = keys
        .iter()
        .zip(&args.pubkeys)
        .map(|(key, pubkey)| match pubkey.key_id {
            Some(key_id) => KeyRecord::with_key_id(key, key_id),
            None => KeyRecord::new(key),
        })
        .collect();

    let enc_key = args.enc_key.as_deref().map(read_enc_key).transpose()?;
    let encryption_key = enc_key
        .as_deref()
        .zip(args.enc_scheme)
        .map(|(key, scheme)| EncryptionKey::new(scheme.into(), key));

    let policy_file = args
        .policy
        .as_deref()
        .map(PolicyFile::load)
        .transpose()?
        .unwrap_or_default();
    let policy = policy_file.policy();

    match records.len() {
        1 => verify_with::<1>(records, encryption_key, &policy, &image),
        2 => verify_with::<2>(records, encryption_key, &policy, &image),
        3 => verify_with::<3>(records, encryption_key, &policy, &image),
        4 => verify_with::<4>(records, encryption_key, &policy, &image),
        n => bail!(
            "Between 1 and {} public keys are supported, got {}",
            MAX_PUBKEYS,
            n
        ),
    }
}

fn read_enc_key(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Cannot read encryption key '{}'", path.display()))
}

fn verify_with<const N: usize>(
    records: Vec<KeyRecord<'_>>,
    encryption_key: Option<EncryptionKey<'_>>,
    policy: &VerifyPolicy<'_>,
    image: &[u8],
) -> Result<Verdict> {
    let keys: [KeyRecord; N] = records
        .try_into()
        .map_err(|_| anyhow!("Expected {} public keys", N))?;
    let store = KeyStore::new(keys, encryption_key);
    let engine = VerificationEngine::new(&store, policy, Sha384Engine, EcdsaP384Verifier);
    Ok(engine.verify(image))
}

pub(crate) fn info(args: &InfoArgs) -> Result<()> {
    let image = read_image(&args.image)?;
    print!("{}", describe(&image)?);
    Ok(())
}

fn tag_name(kind: u16) -> &'static str {
    match kind {
        TLV_KEY_ID => "KEY_ID",
        TLV_SHA384 => "SHA384",
        TLV_ECDSA_P384 => "ECDSA_P384",
        TLV_ENC_KW128 => "ENC_KW128",
        TLV_ENC_KW256 => "ENC_KW256",
        _ => "unknown",
    }
}

fn preview(data: &[u8]) -> String {
    const MAX: usize = 16;
    if data.len() > MAX {
        format!("{}..", hex::encode(&data[..MAX]))
    } else {
        hex::encode(data)
    }
}

/// Human-readable dump of the header and every trailer entry.
///
/// Works on images that fail verification, as long as the header and the
/// trailer can be walked.
pub(crate) fn describe(image: &[u8]) -> Result<String> {
    let layout = ImageLayout::from_image(image).context("Invalid image header")?;
    let header = layout.header;
    let mut out = String::new();
    writeln!(out, "magic:            {:#010x}", header.magic.get())?;
    writeln!(out, "header version:   {}", header.header_version.get())?;
    writeln!(out, "header size:      {}", header.header_size.get())?;
    writeln!(out, "payload size:     {}", header.payload_size.get())?;
    writeln!(out, "total size:       {}", header.total_size.get())?;
    writeln!(out, "flags:            {:#010x}", header.flags.get())?;
    writeln!(out, "encrypted:        {}", header.is_encrypted())?;
    writeln!(out, "load address:     {:#010x}", header.load_addr.get())?;
    writeln!(out, "version:          {}", header.image_version)?;
    writeln!(out, "security counter: {}", header.security_counter.get())?;
    writeln!(
        out,
        "trailer:          {:#x}..{:#x}",
        layout.trailer_span.start, layout.trailer_span.end
    )?;
    for entry in layout.tlvs(image).context("Invalid trailer")? {
        let entry = entry.context("Invalid trailer entry")?;
        writeln!(
            out,
            "  {:#06x} {:<10} {:>4} bytes @ {:#06x}  {}",
            entry.kind,
            tag_name(entry.kind),
            entry.data.len(),
            entry.offset,
            preview(entry.data)
        )?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigboot_emulator_keys::{test_keys, VENDOR_KEY_0, VENDOR_KEY_0_ID, VENDOR_KEY_1};
    use sigboot_error::RejectReason;
    use tempfile::TempDir;

    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            for (name, pem) in [
                ("vendor-0.pem", test_keys::VENDOR_0),
                ("vendor-2.pem", test_keys::VENDOR_2),
            ] {
                std::fs::write(dir.path().join(name), pem).unwrap();
            }
            std::fs::write(dir.path().join("vendor-0.pub.bin"), VENDOR_KEY_0).unwrap();
            std::fs::write(dir.path().join("vendor-1.pub.bin"), VENDOR_KEY_1).unwrap();
            std::fs::write(dir.path().join("payload.bin"), b"host tool payload").unwrap();
            Workspace { dir }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn sign_args(&self, key: &str) -> SignArgs {
            SignArgs {
                payload: self.path("payload.bin"),
                key: self.path(key),
                output: self.path("image.bin"),
                key_id: None,
                load_addr: 0x4000_0000,
                image_version: ImageVersion::new(1, 0, 0, 7),
                security_counter: 2,
                header_size: IMAGE_HEADER_SIZE as u16,
                digest: true,
                enc_scheme: None,
                wrapped_key: None,
            }
        }

        fn verify_args(&self) -> VerifyArgs {
            VerifyArgs {
                image: self.path("image.bin"),
                pubkeys: vec![
                    PubkeyArg {
                        path: self.path("vendor-1.pub.bin"),
                        key_id: None,
                    },
                    PubkeyArg {
                        path: self.path("vendor-0.pub.bin"),
                        key_id: Some(VENDOR_KEY_0_ID),
                    },
                ],
                policy: None,
                enc_key: None,
                enc_scheme: None,
            }
        }
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("1.2.3+4").unwrap(), ImageVersion::new(1, 2, 3, 4));
        assert_eq!(parse_version("0.0.9").unwrap(), ImageVersion::new(0, 0, 9, 0));
        assert!(parse_version("1.2").is_err());
        assert!(parse_version("256.0.0").is_err());
        assert!(parse_version("1.2.3+x").is_err());
    }

    #[test]
    fn test_parse_pubkey() {
        let arg = parse_pubkey("keys/a.bin,0x11").unwrap();
        assert_eq!(arg.path, PathBuf::from("keys/a.bin"));
        assert_eq!(arg.key_id, Some(0x11));
        assert_eq!(parse_pubkey("a.bin").unwrap().key_id, None);
        assert!(parse_pubkey("a.bin,zz").is_err());
    }

    #[test]
    fn test_sign_then_verify() {
        let ws = Workspace::new();
        sign(&ws.sign_args("vendor-0.pem")).unwrap();

        let verdict = verify_image(&ws.verify_args()).unwrap();
        let accepted = verdict.accepted().unwrap();
        assert_eq!(accepted.key_index(), 1);
        assert_eq!(accepted.security_counter(), 2);
        verify(&ws.verify_args()).unwrap();
    }

    #[test]
    fn test_untrusted_key_is_rejected() {
        let ws = Workspace::new();
        sign(&ws.sign_args("vendor-2.pem")).unwrap();
        assert_eq!(
            verify_image(&ws.verify_args()).unwrap().reason(),
            Some(RejectReason::BadSignature)
        );
        let err = verify(&ws.verify_args()).unwrap_err();
        assert!(err.to_string().contains("Image rejected"));
    }

    #[test]
    fn test_unknown_key_id() {
        let ws = Workspace::new();
        let mut args = ws.sign_args("vendor-0.pem");
        args.key_id = Some(0x99);
        sign(&args).unwrap();
        assert_eq!(
            verify_image(&ws.verify_args()).unwrap().reason(),
            Some(RejectReason::UnknownKey)
        );
    }

    #[test]
    fn test_policy_file() {
        let ws = Workspace::new();
        sign(&ws.sign_args("vendor-0.pem")).unwrap();
        std::fs::write(ws.path("policy.toml"), "min_security_counter = 3\n").unwrap();

        let mut args = ws.verify_args();
        args.policy = Some(ws.path("policy.toml"));
        assert_eq!(
            verify_image(&args).unwrap().reason(),
            Some(RejectReason::SecurityCounterTooLow {
                image: 2,
                minimum: 3
            })
        );
    }

    #[test]
    fn test_encrypted_image() {
        let ws = Workspace::new();
        let mut sign_args = ws.sign_args("vendor-0.pem");
        sign_args.enc_scheme = Some(Scheme::AesKw256);
        sign_args.wrapped_key = Some("ab".repeat(40));
        sign(&sign_args).unwrap();

        assert_eq!(
            verify_image(&ws.verify_args()).unwrap().reason(),
            Some(RejectReason::EncryptionKeyMissing)
        );

        std::fs::write(ws.path("kek.bin"), [0x42; 32]).unwrap();
        let mut args = ws.verify_args();
        args.enc_key = Some(ws.path("kek.bin"));
        args.enc_scheme = Some(Scheme::AesKw256);
        assert!(verify_image(&args).unwrap().accepted().unwrap().encrypted());

        args.enc_scheme = Some(Scheme::AesKw128);
        assert_eq!(
            verify_image(&args).unwrap().reason(),
            Some(RejectReason::EncryptionSchemeMismatch)
        );
    }

    #[test]
    fn test_bad_wrapped_key() {
        let ws = Workspace::new();
        let mut args = ws.sign_args("vendor-0.pem");
        args.enc_scheme = Some(Scheme::AesKw128);
        args.wrapped_key = Some("not hex".into());
        assert!(sign(&args).is_err());

        args.wrapped_key = Some("00".repeat(40));
        assert!(sign(&args).is_err());
    }

    #[test]
    fn test_too_many_keys() {
        let ws = Workspace::new();
        sign(&ws.sign_args("vendor-0.pem")).unwrap();
        let mut args = ws.verify_args();
        let extra = args.pubkeys[0].clone();
        args.pubkeys.extend(std::iter::repeat(extra).take(MAX_PUBKEYS));
        assert!(verify_image(&args).is_err());
    }

    #[test]
    fn test_describe() {
        let ws = Workspace::new();
        let mut args = ws.sign_args("vendor-0.pem");
        args.key_id = Some(VENDOR_KEY_0_ID);
        sign(&args).unwrap();

        let image = read_image(&ws.path("image.bin")).unwrap();
        let text = describe(&image).unwrap();
        assert!(text.contains("load address:     0x40000000"));
        assert!(text.contains("version:          1.0.0+7"));
        assert!(text.contains("KEY_ID"));
        assert!(text.contains("SHA384"));
        assert!(text.contains("ECDSA_P384"));
        assert!(text.contains("10000000"));

        assert!(describe(&image[..20]).is_err());
        info(&InfoArgs {
            image: ws.path("image.bin"),
        })
        .unwrap();
    }
}
