// Licensed under the Apache-2.0 license

//! Routes the verifier's ROM console into the `log` facade.

use core::fmt::{self, Write};

#[derive(Default)]
struct LogPrinter {
    line: String,
}

impl Write for LogPrinter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if ch == '\n' {
                log::debug!("{}", self.line);
                self.line.clear();
            } else {
                self.line.push(ch);
            }
        }
        Ok(())
    }
}

pub(crate) fn install() {
    romtime::set_printer(Box::leak(Box::<LogPrinter>::default()));
}
