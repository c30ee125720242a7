//! Bitstream loading, inspection, and editing.
//!
//! A [`Bitstream`] owns the raw bytes of a `.bit` or `.bin` file plus the
//! offsets derived during the load-time packet walk: sync position, frame
//! data region, IDCODE, and the CRC check command. Mutation happens only
//! through [`write_frame_data_bit`] and [`update_crc`]; saving emits the
//! stored bytes unchanged otherwise, so a load/save round trip is
//! byte-identical.
//!
//! [`write_frame_data_bit`]: Bitstream::write_frame_data_bit
//! [`update_crc`]: Bitstream::update_crc

use crate::constants::{CTL0_DEC_MASK, PACKET_HEADER_SIZE};
use crate::crc;
use crate::error::X7Error;
use crate::header::{self, BitHeader, Format};
use crate::packet::{self, Opcode, Packet, PacketType, Reg};
use bytes::Buf;
use std::fs::File;
use std::io::{Read, Write};
use std::ops::Range;
use std::path::Path;
use tracing::{debug, trace};

/// An in-memory Series-7 bitstream.
#[derive(Debug, Clone)]
pub struct Bitstream {
    data: Vec<u8>,
    bit_header: Option<BitHeader>,
    /// Configuration payload range within `data` (whole file for `.bin`).
    payload: Range<usize>,
    sync_offset: usize,
    frame_data_offset: usize,
    frame_data_size: usize,
    idcode: Option<u32>,
    crc_check_offset: Option<usize>,
}

impl Bitstream {
    /// Loads an uncompressed, unencrypted bitstream from a file.
    ///
    /// `expected_idcode` of `None` accepts whatever IDCODE the stream
    /// declares; any other value must match the decoded IDCODE.
    pub fn load<P: AsRef<Path>>(
        path: P,
        format: Format,
        expected_idcode: Option<u32>,
    ) -> Result<Self, X7Error> {
        debug!(path = %path.as_ref().display(), ?format, "loading bitstream");
        Self::from_reader(File::open(path)?, format, expected_idcode)
    }

    /// Loads a bitstream from a readable stream.
    pub fn from_reader<R: Read>(
        mut reader: R,
        format: Format,
        expected_idcode: Option<u32>,
    ) -> Result<Self, X7Error> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data, format, expected_idcode)
    }

    /// Builds a bitstream from an in-memory byte vector.
    pub fn from_bytes(
        data: Vec<u8>,
        format: Format,
        expected_idcode: Option<u32>,
    ) -> Result<Self, X7Error> {
        let (bit_header, payload) = match format {
            Format::Bit => {
                let (bit_header, payload) = header::parse_bit_header(&data)?;
                trace!(?bit_header, ?payload, "parsed .bit header");
                (Some(bit_header), payload)
            }
            Format::Raw => (None, 0..data.len()),
        };

        let payload_slice = &data[payload.clone()];
        let sync_offset =
            payload.start + packet::find_sync(payload_slice, 0).ok_or(X7Error::SyncNotFound)?;

        let mut idcode = None;
        let mut frame_region: Option<(usize, usize)> = None;
        let mut crc_check_offset = None;
        // (op, reg, word_count) of the immediately preceding Type-1 packet
        let mut prev_type1: Option<(Opcode, Option<Reg>, u32)> = None;
        let mut refusal: Option<X7Error> = None;

        packet::parse_with_base(payload_slice, payload.start, |pkt| {
            if let Some(error) = refuse(pkt, &data) {
                refusal = Some(error);
                return false;
            }
            match pkt.packet_type {
                PacketType::Type1 => {
                    if pkt.is_write() && pkt.word_count == 1 {
                        match pkt.reg {
                            Some(Reg::Idcode) if idcode.is_none() => {
                                let value = (&data[pkt.payload_start..]).get_u32();
                                debug!("found IDCODE {value:#010x}");
                                idcode = Some(value);
                            }
                            Some(Reg::Crc) if crc_check_offset.is_none() => {
                                debug!(offset = pkt.storage_offset, "found CRC check command");
                                crc_check_offset = Some(pkt.storage_offset);
                            }
                            _ => {}
                        }
                    }
                    prev_type1 = Some((pkt.op, pkt.reg, pkt.word_count));
                }
                PacketType::Type2 => {
                    if pkt.is_write()
                        && pkt.reg == Some(Reg::Fdri)
                        && prev_type1 == Some((Opcode::Write, Some(Reg::Fdri), 0))
                    {
                        if frame_region.is_none() {
                            debug!(
                                offset = pkt.payload_start,
                                size = pkt.payload_len(),
                                "found frame data region"
                            );
                            frame_region = Some((pkt.payload_start, pkt.payload_len()));
                        } else {
                            debug!(
                                stream_index = pkt.stream_index,
                                offset = pkt.payload_start,
                                "ignoring secondary frame data region"
                            );
                        }
                    }
                    prev_type1 = None;
                }
            }
            true
        })?;
        if let Some(error) = refusal {
            return Err(error);
        }

        if let Some(expected) = expected_idcode {
            if idcode != Some(expected) {
                return Err(X7Error::IdCodeMismatch {
                    expected,
                    found: idcode,
                });
            }
        }

        let (frame_data_offset, frame_data_size) = frame_region.unwrap_or((sync_offset, 0));
        Ok(Self {
            data,
            bit_header,
            payload,
            sync_offset,
            frame_data_offset,
            frame_data_size,
            idcode,
            crc_check_offset,
        })
    }

    /// Saves the bitstream to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), X7Error> {
        self.write_to(File::create(path)?)
    }

    /// Writes the bitstream bytes to a writable stream.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), X7Error> {
        writer.write_all(&self.data)?;
        Ok(())
    }

    /// The raw file bytes, mutations included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Metadata from the `.bit` header, if the file had one.
    pub fn header(&self) -> Option<&BitHeader> {
        self.bit_header.as_ref()
    }

    /// Byte offset of the first byte after the sync word.
    pub fn sync_offset(&self) -> usize {
        self.sync_offset
    }

    /// Byte offset of the first byte of the configuration frame data.
    pub fn frame_data_offset(&self) -> usize {
        self.frame_data_offset
    }

    /// Size of the configuration frame data in bytes.
    pub fn frame_data_size(&self) -> usize {
        self.frame_data_size
    }

    /// The IDCODE declared by the stream, if any.
    pub fn idcode(&self) -> Option<u32> {
        self.idcode
    }

    /// Byte offset of the CRC check command header, if present.
    pub fn crc_check_offset(&self) -> Option<usize> {
        self.crc_check_offset
    }

    /// The frame data region.
    pub fn frame_data(&self) -> &[u8] {
        &self.data[self.frame_data_offset..self.frame_data_offset + self.frame_data_size]
    }

    /// The frame data region, mutable.
    pub fn frame_data_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.frame_data_offset..self.frame_data_offset + self.frame_data_size]
    }

    /// Reads a bit from the frame data area.
    ///
    /// `bit_offset` addresses the logical bit stream; the 32-bit word swap
    /// between file order and logical order is applied internally.
    pub fn read_frame_data_bit(&self, bit_offset: usize) -> Result<bool, X7Error> {
        self.check_frame_bit_range(bit_offset)?;
        let byte = map_frame_data_offset(bit_offset / 8);
        let mask = 1u8 << (bit_offset & 7);
        Ok(self.data[self.frame_data_offset + byte] & mask != 0)
    }

    /// Writes a bit in the frame data area (word swap applied internally).
    pub fn write_frame_data_bit(&mut self, bit_offset: usize, value: bool) -> Result<(), X7Error> {
        self.check_frame_bit_range(bit_offset)?;
        let byte = map_frame_data_offset(bit_offset / 8);
        let mask = 1u8 << (bit_offset & 7);
        if value {
            self.data[self.frame_data_offset + byte] |= mask;
        } else {
            self.data[self.frame_data_offset + byte] &= !mask;
        }
        Ok(())
    }

    /// Recomputes the embedded CRC and rewrites the check command operand.
    ///
    /// A no-op for bitstreams without a CRC check command.
    pub fn update_crc(&mut self) -> Result<(), X7Error> {
        let Some(check_offset) = self.crc_check_offset else {
            trace!("no CRC check command, nothing to update");
            return Ok(());
        };
        let crc = crc::stream_crc(&self.data, self.sync_offset, check_offset, self.payload.end)?;
        let operand = check_offset + PACKET_HEADER_SIZE;
        self.data[operand..operand + 4].copy_from_slice(&crc.to_be_bytes());
        debug!("rewrote CRC check operand to {crc:#010x}");
        Ok(())
    }

    fn check_frame_bit_range(&self, bit_offset: usize) -> Result<(), X7Error> {
        let limit = self.frame_data_size * 8;
        if bit_offset >= limit {
            return Err(X7Error::OutOfRange {
                index: bit_offset,
                limit,
            });
        }
        Ok(())
    }
}

/// Remaps a byte offset into the frame data area for the 32-bit word swap:
/// the file stores each word big-endian while the logical bit stream runs
/// through it little-endian byte first.
pub(crate) fn map_frame_data_offset(offset: usize) -> usize {
    offset ^ 3
}

/// Encrypted and compressed bitstreams are not supported; spot their
/// marker writes during the load walk and refuse early.
fn refuse(pkt: &Packet, data: &[u8]) -> Option<X7Error> {
    if !pkt.is_write() {
        return None;
    }
    match pkt.reg {
        Some(Reg::Cbc) => Some(X7Error::Unsupported(
            "encrypted bitstream (CBC write)".to_string(),
        )),
        Some(Reg::Mfwr) => Some(X7Error::Unsupported(
            "compressed bitstream (MFWR write)".to_string(),
        )),
        Some(Reg::Ctl0) if pkt.word_count >= 1 => {
            let ctl0 = (&data[pkt.payload_start..]).get_u32();
            if ctl0 & CTL0_DEC_MASK != 0 {
                Some(X7Error::Unsupported(
                    "encrypted bitstream (CTL0.DEC set)".to_string(),
                ))
            } else {
                None
            }
        }
        _ => None,
    }
}
