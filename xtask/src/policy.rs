// Licensed under the Apache-2.0 license

//! Verification policy loaded from a TOML file.
//!
//! ```toml
//! require_encryption = false
//! mandatory_tags = [0x0011]
//! min_security_counter = 3
//! ```
//!
//! Missing fields take the values of `VerifyPolicy::DEFAULT`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use sigboot_config::VerifyPolicy;

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct PolicyFile {
    #[serde(default)]
    pub require_encryption: bool,
    #[serde(default)]
    pub mandatory_tags: Vec<u16>,
    #[serde(default)]
    pub min_security_counter: u32,
}

impl PolicyFile {
    pub(crate) fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid policy file")
    }

    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read policy file '{}'", path.display()))?;
        Self::parse(&text).with_context(|| format!("In '{}'", path.display()))
    }

    pub(crate) fn policy(&self) -> VerifyPolicy<'_> {
        VerifyPolicy::new(
            self.require_encryption,
            &self.mandatory_tags,
            self.min_security_counter,
        )
    }
}
