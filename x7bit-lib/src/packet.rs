//! Configuration packet decoding.
//!
//! Packet semantics follow [Xilinx UG470; "Bitstream Composition"]: a
//! Type-1 header carries opcode, register address and a short word count;
//! a Type-2 header carries only a large word count and inherits opcode and
//! register from the most recent Type-1 of the same substream.

use crate::constants::{PACKET_HEADER_SIZE, SYNC_BYTES, WORD_SIZE};
use crate::error::X7Error;
use bytes::Buf;
use modular_bitfield::prelude::*;
use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::trace;

#[bitfield(bytes = 4)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Type1Header {
    pub word_count: B11,
    #[skip]
    reserved0: B2,
    pub reg: B5,
    #[skip]
    reserved1: B9,
    pub op: B2,
    pub packet_type: B3,
}

#[bitfield(bytes = 4)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Type2Header {
    pub word_count: B27,
    pub op: B2,
    pub packet_type: B3,
}

/// Packet header type (bits 31:29 of the header word).
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum PacketType {
    Type1 = 1,
    Type2 = 2,
}

/// Packet opcode (bits 28:27 of a Type-1 header word).
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0,
    Read = 1,
    Write = 2,

    #[num_enum(catch_all)]
    Reserved(u8),
}

/// Configuration register addresses (5 bits, UG470 table 5-23).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum Reg {
    Crc = 0,
    Far = 1,
    Fdri = 2,
    Fdro = 3,
    Cmd = 4,
    Ctl0 = 5,
    Mask = 6,
    Stat = 7,
    Lout = 8,
    Cor0 = 9,
    Mfwr = 10,
    Cbc = 11,
    Idcode = 12,
    Axss = 13,
    Cor1 = 14,
    Wbstar = 16,
    Timer = 17,
    RbcrcSw = 19,
    Bootsts = 22,
    Ctl1 = 24,
    Bspi = 31,

    #[num_enum(catch_all)]
    Unknown(u8),
}

/// Command codes written to the CMD register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u32)]
pub enum CmdCode {
    Null = 0,
    Wcfg = 1,
    Desync = 0x0000_000F,

    #[num_enum(catch_all)]
    Unknown(u32),
}

/// One decoded configuration packet.
///
/// Packet records are transient views produced during a parse walk; the
/// payload range indexes the same buffer the walk ran over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Zero-based index of the (sub-)bitstream this packet belongs to.
    pub stream_index: usize,
    /// Offset of the header word within the enclosing file/buffer storage.
    pub storage_offset: usize,
    /// Offset of the header word within its own substream.
    pub offset: usize,
    /// The raw header word.
    pub hdr: u32,
    pub packet_type: PacketType,
    /// Opcode; inherited from the previous Type-1 for Type-2 packets.
    pub op: Opcode,
    /// Register address; `None` for a Type-2 with no preceding Type-1.
    pub reg: Option<Reg>,
    /// Number of 32-bit payload words.
    pub word_count: u32,
    /// Start of the payload, as a byte offset into the parsed buffer.
    pub payload_start: usize,
    /// End of the payload (half-open), as a byte offset into the parsed buffer.
    pub payload_end: usize,
}

impl Packet {
    pub fn payload_len(&self) -> usize {
        self.payload_end - self.payload_start
    }

    pub fn is_write(&self) -> bool {
        self.op == Opcode::Write
    }
}

/// Finds the sync word at any byte alignment, searching from `from`.
///
/// Returns the offset of the first byte *after* the sync pattern.
pub fn find_sync(data: &[u8], from: usize) -> Option<usize> {
    if from >= data.len() {
        return None;
    }
    data[from..]
        .windows(SYNC_BYTES.len())
        .position(|window| window == SYNC_BYTES)
        .map(|pos| from + pos + SYNC_BYTES.len())
}

/// Pull-style decoder for the packets of a single substream.
///
/// `data` must start at the first byte after the sync word. Iteration ends
/// at the end of the data or after a DESYNC command packet; [`consumed`]
/// reports how far the reader got either way.
///
/// [`consumed`]: PacketReader::consumed
pub struct PacketReader<'a> {
    data: &'a [u8],
    /// Storage offset of `data[0]` within the enclosing file/buffer.
    base_offset: usize,
    stream_index: usize,
    cursor: usize,
    carry: Option<(Opcode, Reg)>,
    finished: bool,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8], base_offset: usize, stream_index: usize) -> Self {
        Self {
            data,
            base_offset,
            stream_index,
            cursor: 0,
            carry: None,
            finished: false,
        }
    }

    /// Number of bytes of `data` consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    fn decode_next(&mut self) -> Result<Packet, X7Error> {
        let offset = self.cursor;
        let storage_offset = self.base_offset + offset;

        if self.data.len() - self.cursor < PACKET_HEADER_SIZE {
            self.finished = true;
            return Err(X7Error::TruncatedPacket {
                offset: storage_offset,
            });
        }
        let hdr = (&self.data[self.cursor..]).get_u32();

        let raw_type = (hdr >> 29) & 0x7;
        let packet_type = PacketType::try_from(raw_type as u8).map_err(|_| {
            self.finished = true;
            X7Error::UnknownPacketType {
                packet_type: raw_type,
                offset: storage_offset,
            }
        })?;

        let (op, reg, word_count) = match packet_type {
            PacketType::Type1 => {
                let header = Type1Header::from_bytes(hdr.to_le_bytes());
                let op = Opcode::from_primitive(header.op());
                let reg = Reg::from_primitive(header.reg());
                self.carry = Some((op, reg));
                (op, Some(reg), u32::from(header.word_count()))
            }
            PacketType::Type2 => {
                // Type-2 opcode bits mirror the preceding Type-1; the decoder
                // reports the inherited values.
                let header = Type2Header::from_bytes(hdr.to_le_bytes());
                let (op, reg) = match self.carry {
                    Some((op, reg)) => (op, Some(reg)),
                    None => (Opcode::Nop, None),
                };
                (op, reg, header.word_count())
            }
        };

        let payload_offset = self.cursor + PACKET_HEADER_SIZE;
        let payload_len = word_count as usize * WORD_SIZE;
        if payload_offset + payload_len > self.data.len() {
            self.finished = true;
            return Err(X7Error::TruncatedPacket {
                offset: storage_offset,
            });
        }

        let packet = Packet {
            stream_index: self.stream_index,
            storage_offset,
            offset,
            hdr,
            packet_type,
            op,
            reg,
            word_count,
            payload_start: self.base_offset + payload_offset,
            payload_end: self.base_offset + payload_offset + payload_len,
        };
        self.cursor = payload_offset + payload_len;

        if packet.packet_type == PacketType::Type1
            && packet.is_write()
            && packet.reg == Some(Reg::Cmd)
            && packet.word_count >= 1
        {
            let command = (&self.data[payload_offset..]).get_u32();
            if CmdCode::from_primitive(command) == CmdCode::Desync {
                trace!(
                    stream_index = self.stream_index,
                    offset,
                    "desync command, substream ends"
                );
                self.finished = true;
            }
        }

        Ok(packet)
    }
}

impl<'a> Iterator for PacketReader<'a> {
    type Item = Result<Packet, X7Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.cursor == self.data.len() {
            return None;
        }
        Some(self.decode_next())
    }
}

/// Parses every packet of every substream in `data`, invoking `handler`
/// for each. A `false` return from the handler stops the walk.
///
/// Returns the number of bytes consumed (up to the end of the last packet
/// decoded). Fails with [`X7Error::SyncNotFound`] if no substream at all
/// is present.
pub fn parse<F>(data: &[u8], handler: F) -> Result<usize, X7Error>
where
    F: FnMut(&Packet) -> bool,
{
    parse_with_base(data, 0, handler)
}

/// Like [`parse`], with packet offsets reported relative to an enclosing
/// buffer: `base_offset` is the storage position of `data[0]`.
pub fn parse_with_base<F>(data: &[u8], base_offset: usize, mut handler: F) -> Result<usize, X7Error>
where
    F: FnMut(&Packet) -> bool,
{
    let mut pos = 0;
    let mut stream_index = 0;
    while let Some(stream_start) = find_sync(data, pos) {
        trace!(
            stream_index,
            offset = base_offset + stream_start,
            "sync word found"
        );
        let mut packets = PacketReader::new(
            &data[stream_start..],
            base_offset + stream_start,
            stream_index,
        );
        while let Some(packet) = packets.next() {
            let packet = packet?;
            if !handler(&packet) {
                return Ok(stream_start + packets.consumed());
            }
        }
        pos = stream_start + packets.consumed();
        stream_index += 1;
    }
    if stream_index == 0 {
        return Err(X7Error::SyncNotFound);
    }
    Ok(pos)
}

/// Parses the packets of a bitstream read from `reader`.
pub fn parse_reader<R, F>(mut reader: R, handler: F) -> Result<usize, X7Error>
where
    R: Read,
    F: FnMut(&Packet) -> bool,
{
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    parse(&data, handler)
}

/// Parses the packets of the bitstream file at `path`.
pub fn parse_file<P, F>(path: P, handler: F) -> Result<usize, X7Error>
where
    P: AsRef<Path>,
    F: FnMut(&Packet) -> bool,
{
    parse_reader(File::open(path)?, handler)
}
