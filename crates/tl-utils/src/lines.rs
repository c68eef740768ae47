//! Line iteration over text in any supported encoding.

use crate::unicode::{decode_utf16, decode_utf8, Encoding, Endian};

/// Iterator over the lines of a byte buffer, yielding owned UTF-8 strings.
///
/// Lines are split on CR, LF, or CRLF in the code-unit domain of the source
/// encoding, so a stray 0x0A byte inside a UTF-16 code unit does not break a
/// line. Line terminators are not part of the yielded strings; a trailing
/// terminator does not produce a final empty line.
#[derive(Debug, Clone)]
pub struct Lines<'a> {
    data: &'a [u8],
    pos: usize,
    encoding: Encoding,
}

impl<'a> Lines<'a> {
    /// Sniff the encoding of `data`, skip its BOM, and iterate its lines.
    pub fn new(data: &'a [u8]) -> Self {
        let (encoding, bom) = Encoding::sniff(data);
        Lines {
            data: &data[bom..],
            pos: 0,
            encoding,
        }
    }

    /// Iterate lines of `data` in a known encoding (no BOM handling).
    pub fn with_encoding(data: &'a [u8], encoding: Encoding) -> Self {
        Lines {
            data,
            pos: 0,
            encoding,
        }
    }

    fn next_utf8(&mut self) -> Option<String> {
        if self.pos >= self.data.len() {
            return None;
        }

        let start = self.pos;
        let mut end = start;
        while end < self.data.len() && self.data[end] != b'\r' && self.data[end] != b'\n' {
            end += 1;
        }

        let line: String = decode_utf8(&self.data[start..end]).collect();

        self.pos = end;
        if self.pos < self.data.len() {
            let term = self.data[self.pos];
            self.pos += 1;
            if term == b'\r' && self.pos < self.data.len() && self.data[self.pos] == b'\n' {
                self.pos += 1;
            }
        }

        Some(line)
    }

    fn next_utf16(&mut self, endian: Endian) -> Option<String> {
        // Round down to whole code units; a dangling odd byte is ignored.
        let end_of_units = self.data.len() & !1;
        if self.pos >= end_of_units {
            return None;
        }

        let data = self.data;
        let unit = move |at: usize| -> u16 {
            let pair = [data[at], data[at + 1]];
            match endian {
                Endian::Little => u16::from_le_bytes(pair),
                Endian::Big => u16::from_be_bytes(pair),
            }
        };

        let start = self.pos;
        let mut end = start;
        while end < end_of_units {
            let u = unit(end);
            if u == u16::from(b'\r') || u == u16::from(b'\n') {
                break;
            }
            end += 2;
        }

        let line: String = decode_utf16(&self.data[start..end], endian).collect();

        self.pos = end;
        if self.pos < end_of_units {
            let term = unit(self.pos);
            self.pos += 2;
            if term == u16::from(b'\r')
                && self.pos < end_of_units
                && unit(self.pos) == u16::from(b'\n')
            {
                self.pos += 2;
            }
        }

        Some(line)
    }
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match self.encoding {
            Encoding::Utf8 => self.next_utf8(),
            Encoding::Utf16Le => self.next_utf16(Endian::Little),
            Encoding::Utf16Be => self.next_utf16(Endian::Big),
        }
    }
}
