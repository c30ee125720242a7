//! `.bit` file header handling.
//!
//! A `.bit` file wraps the raw configuration payload in a short tagged
//! header: a 9-byte magic field, a `0x0001` trailer, then records tagged
//! `'a'`..`'d'` (design name, part name, date, time as length-prefixed
//! ASCII) and finally `'e'`, whose 32-bit length introduces the
//! configuration payload itself. A `.bin` file has no header at all.

use crate::constants::{BIT_MAGIC_LEN, BIT_MAGIC_TRAILER};
use crate::error::X7Error;
use bytes::Buf;
use std::ops::Range;

/// Type of bitstream data to be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Bitstream (`.bit`) format with configuration headers
    Bit,
    /// Raw (`.bin`) format only containing the configuration payload
    Raw,
}

/// Metadata fields carried by a `.bit` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitHeader {
    pub design_name: Option<String>,
    pub part_name: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

fn need(buf: &[u8], count: usize, what: &str) -> Result<(), X7Error> {
    if buf.remaining() < count {
        return Err(X7Error::MalformedHeader(format!(
            "truncated {what}: need {count} bytes, {remaining} left",
            remaining = buf.remaining()
        )));
    }
    Ok(())
}

fn ascii_field(body: &[u8]) -> String {
    let body = body.strip_suffix(&[0]).unwrap_or(body);
    String::from_utf8_lossy(body).into_owned()
}

/// Parses the variable-length `.bit` header at the start of `data`.
///
/// Returns the decoded metadata and the byte range of the configuration
/// payload (the `'e'` record body). Bytes past the payload are ignored.
pub fn parse_bit_header(data: &[u8]) -> Result<(BitHeader, Range<usize>), X7Error> {
    let mut buf = data;

    need(buf, 2, "magic length")?;
    let magic_len = buf.get_u16() as usize;
    if magic_len != BIT_MAGIC_LEN {
        return Err(X7Error::MalformedHeader(format!(
            "unexpected magic field length {magic_len}"
        )));
    }
    need(buf, magic_len, "magic field")?;
    buf.advance(magic_len);

    need(buf, 2, "magic trailer")?;
    let trailer = buf.get_u16();
    if trailer != BIT_MAGIC_TRAILER {
        return Err(X7Error::MalformedHeader(format!(
            "unexpected magic trailer {trailer:#06x}"
        )));
    }

    let mut header = BitHeader::default();
    loop {
        if !buf.has_remaining() {
            return Err(X7Error::MalformedHeader(
                "missing configuration payload record".to_string(),
            ));
        }
        let tag = buf.get_u8();
        match tag {
            b'a'..=b'd' => {
                need(buf, 2, "record length")?;
                let len = buf.get_u16() as usize;
                need(buf, len, "record body")?;
                let (body, rest) = buf.split_at(len);
                buf = rest;
                let field = ascii_field(body);
                match tag {
                    b'a' => header.design_name = Some(field),
                    b'b' => header.part_name = Some(field),
                    b'c' => header.date = Some(field),
                    _ => header.time = Some(field),
                }
            }
            b'e' => {
                need(buf, 4, "payload length")?;
                let len = buf.get_u32() as usize;
                if buf.remaining() < len {
                    return Err(X7Error::MalformedHeader(format!(
                        "payload length {len} exceeds remaining {remaining} bytes",
                        remaining = buf.remaining()
                    )));
                }
                let start = data.len() - buf.remaining();
                return Ok((header, start..start + len));
            }
            other => {
                return Err(X7Error::MalformedHeader(format!(
                    "unknown header tag {other:#04x}"
                )));
            }
        }
    }
}
