//! Configuration CRC recomputation.
//!
//! The configuration engine folds every register write into a 32-bit CRC
//! as a 37-bit quantity: the data word shifted in first, then the 5-bit
//! register address, LSB first, through a reflected CRC-32C LFSR
//! (polynomial `0x82F63B78`, initial value 0, no final XOR).

use crate::error::X7Error;
use crate::packet::{find_sync, Opcode, PacketReader, Reg};
use bytes::Buf;

/// Reflected form of the CRC-32C polynomial.
pub const CRC32C_POLY: u32 = 0x82F6_3B78;

/// Shifts the low `bits` bits of `value` through the LFSR, LSB first.
pub fn step(mut crc: u32, value: u32, bits: u32) -> u32 {
    for i in 0..bits {
        let feedback = ((value >> i) ^ crc) & 1;
        crc >>= 1;
        if feedback != 0 {
            crc ^= CRC32C_POLY;
        }
    }
    crc
}

/// Folds one `(register, data word)` pair into the CRC.
pub fn word_step(crc: u32, reg: u32, word: u32) -> u32 {
    step(step(crc, word, 32), reg, 5)
}

/// Accumulates the CRC over the packet stream between `sync_offset` and
/// the CRC check command at `crc_check_offset`.
///
/// Every WRITE packet with a known register other than CRC contributes
/// one [`word_step`] per payload word, in stream order. The walk crosses
/// DESYNC boundaries the same way the load walk does, so a check command
/// in a later substream still sees every write before it.
pub fn stream_crc(
    data: &[u8],
    sync_offset: usize,
    crc_check_offset: usize,
    payload_end: usize,
) -> Result<u32, X7Error> {
    let mut crc = 0;
    let payload = &data[..payload_end];
    // the caller's sync_offset already points past the first sync word
    let mut pos = sync_offset;
    let mut stream_index = 0;
    loop {
        let mut packets = PacketReader::new(&payload[pos..], pos, stream_index);
        while let Some(packet) = packets.next() {
            let packet = packet?;
            if packet.storage_offset >= crc_check_offset {
                return Ok(crc);
            }
            let Some(reg) = packet.reg else {
                continue;
            };
            if packet.op != Opcode::Write || reg == Reg::Crc {
                continue;
            }
            let reg_addr = u32::from(u8::from(reg));
            let mut words = &data[packet.payload_start..packet.payload_end];
            while words.has_remaining() {
                crc = word_step(crc, reg_addr, words.get_u32());
            }
        }
        pos += packets.consumed();
        match find_sync(payload, pos) {
            Some(next) => pos = next,
            None => return Ok(crc),
        }
        stream_index += 1;
    }
}
