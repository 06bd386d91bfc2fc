// Licensed under the Apache-2.0 license

//! ROM console helpers.
//!
//! Boot code has no allocator and no `std`, so diagnostics go through a
//! single installed [`core::fmt::Write`] sink. When no sink is installed the
//! `print!`/`println!` macros are no-ops, which is also what host unit tests
//! see unless they install one.

#![cfg_attr(target_arch = "riscv32", no_std)]
#![allow(static_mut_refs)]

use core::fmt::{Display, Write};

#[doc(hidden)]
pub static mut PRINTER: Option<&'static mut dyn Write> = None;

/// Installs the console sink used by [`print!`] and [`println!`].
///
/// Must be called once during early boot, before any verification runs.
pub fn set_printer(printer: &'static mut dyn Write) {
    unsafe {
        PRINTER = Some(printer);
    }
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {{
        use core::fmt::Write as _;
        if let Some(printer) = unsafe { $crate::PRINTER.as_mut() } {
            let _ = write!(printer, $($arg)*);
        }
    }};
}

#[macro_export]
macro_rules! println {
    ($($arg:tt)*) => {{
        use core::fmt::Write as _;
        if let Some(printer) = unsafe { $crate::PRINTER.as_mut() } {
            let _ = writeln!(printer, $($arg)*);
        }
    }};
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Lowercase hex rendering of a byte slice, without separators.
pub struct HexBytes<'a>(pub &'a [u8]);

impl Display for HexBytes<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for &byte in self.0 {
            f.write_char(HEX_DIGITS[usize::from(byte >> 4)] as char)?;
            f.write_char(HEX_DIGITS[usize::from(byte & 0xf)] as char)?;
        }
        Ok(())
    }
}

/// A 32-bit value rendered as `0x` followed by eight hex digits.
pub struct HexWord(pub u32);

impl Display for HexWord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("0x")?;
        HexBytes(&self.0.to_be_bytes()).fmt(f)
    }
}

/// Like [`HexBytes`] but only shows the first `N` bytes, followed by `..`
/// when the slice is longer. Keeps digest dumps on one line.
pub struct HexPrefix<'a, const N: usize>(pub &'a [u8]);

impl<const N: usize> Display for HexPrefix<'_, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.0.len() <= N {
            return HexBytes(self.0).fmt(f);
        }
        HexBytes(&self.0[..N]).fmt(f)?;
        f.write_str("..")
    }
}
