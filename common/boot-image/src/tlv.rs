// Licensed under the Apache-2.0 license

use sigboot_error::ParseError;
use zerocopy::FromBytes;

use crate::{TlvEntryHeader, TLV_ENTRY_HEADER_SIZE};

/// One trailer entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TlvEntry<'a> {
    pub kind: u16,
    /// Offset of `data` from the start of the image.
    pub offset: usize,
    pub data: &'a [u8],
}

/// Walks the entries following the trailer info block.
///
/// Yields `Err(MalformedHeader)` once, and then stops, if an entry header or
/// its data would run past the end of the trailer.
pub struct TlvIter<'a> {
    remaining: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> TlvIter<'a> {
    pub(crate) fn new(entries: &'a [u8], offset: usize) -> Self {
        TlvIter {
            remaining: entries,
            offset,
            failed: false,
        }
    }

    fn next_entry(&mut self) -> Result<TlvEntry<'a>, ParseError> {
        let (header, rest) = TlvEntryHeader::ref_from_prefix(self.remaining)
            .map_err(|_| ParseError::MalformedHeader)?;
        let len = usize::from(header.len.get());
        let data = rest.get(..len).ok_or(ParseError::MalformedHeader)?;
        let entry = TlvEntry {
            kind: header.kind.get(),
            offset: self.offset + TLV_ENTRY_HEADER_SIZE,
            data,
        };
        self.remaining = &rest[len..];
        self.offset += TLV_ENTRY_HEADER_SIZE + len;
        Ok(entry)
    }
}

impl<'a> Iterator for TlvIter<'a> {
    type Item = Result<TlvEntry<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining.is_empty() {
            return None;
        }
        let entry = self.next_entry();
        self.failed = entry.is_err();
        Some(entry)
    }
}
