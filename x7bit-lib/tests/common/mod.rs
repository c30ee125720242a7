//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#![allow(dead_code)]
#[allow(unused_imports)]
pub use hex;
#[allow(unused_imports)]
pub use x7bit_lib::bitstream::Bitstream;
#[allow(unused_imports)]
pub use x7bit_lib::error::X7Error;
#[allow(unused_imports)]
pub use x7bit_lib::header::{BitHeader, Format};
#[allow(unused_imports)]
pub use x7bit_lib::packet::{self, Opcode, Packet, PacketReader, PacketType, Reg};

pub const SYNC: u32 = 0xAA99_5566;
pub const NOP: u32 = 0x2000_0000;
pub const DUMMY: u32 = 0xFFFF_FFFF;

pub const OP_WRITE: u32 = 2;

pub const REG_CRC: u32 = 0;
pub const REG_FDRI: u32 = 2;
pub const REG_CMD: u32 = 4;
pub const REG_CTL0: u32 = 5;
pub const REG_MFWR: u32 = 10;
pub const REG_CBC: u32 = 11;
pub const REG_IDCODE: u32 = 12;

pub const CMD_DESYNC: u32 = 0x0000_000F;

pub const IDCODE_XC7Z010: u32 = 0x0372_2093;
pub const IDCODE_XC7Z020: u32 = 0x0372_7093;

/// Decode hex string to bytes for testing
#[allow(dead_code)]
pub fn hex_to_bytes(hex_data: &str) -> Vec<u8> {
    hex::decode(hex_data).expect("Failed to decode hex")
}

pub fn push_word(out: &mut Vec<u8>, word: u32) {
    out.extend_from_slice(&word.to_be_bytes());
}

/// Type-1 packet header word (UG470 layout).
pub fn type1(op: u32, reg: u32, word_count: u32) -> u32 {
    (1 << 29) | (op << 27) | (reg << 13) | word_count
}

/// Type-2 packet header word (UG470 layout).
pub fn type2(op: u32, word_count: u32) -> u32 {
    (2 << 29) | (op << 27) | word_count
}

/// A minimal well-formed payload: dummy pad, sync, NOP, IDCODE write,
/// DESYNC.
#[allow(dead_code)]
pub fn minimal_stream(idcode: u32) -> Vec<u8> {
    let mut out = Vec::new();
    push_word(&mut out, DUMMY);
    push_word(&mut out, SYNC);
    push_word(&mut out, NOP);
    push_word(&mut out, type1(OP_WRITE, REG_IDCODE, 1));
    push_word(&mut out, idcode);
    push_word(&mut out, type1(OP_WRITE, REG_CMD, 1));
    push_word(&mut out, CMD_DESYNC);
    out
}

/// A payload carrying `frame_words` as its FDRI frame data region, with a
/// CRC check command whose operand is `crc_operand`.
#[allow(dead_code)]
pub fn frame_stream(idcode: u32, frame_words: &[u32], crc_operand: u32) -> Vec<u8> {
    let mut out = Vec::new();
    push_word(&mut out, SYNC);
    push_word(&mut out, type1(OP_WRITE, REG_IDCODE, 1));
    push_word(&mut out, idcode);
    push_word(&mut out, type1(OP_WRITE, REG_FDRI, 0));
    push_word(&mut out, type2(OP_WRITE, frame_words.len() as u32));
    for &word in frame_words {
        push_word(&mut out, word);
    }
    push_word(&mut out, type1(OP_WRITE, REG_CRC, 1));
    push_word(&mut out, crc_operand);
    push_word(&mut out, type1(OP_WRITE, REG_CMD, 1));
    push_word(&mut out, CMD_DESYNC);
    out
}

/// Wraps a payload in a `.bit` header with all four metadata records.
#[allow(dead_code)]
pub fn bit_wrap(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&9u16.to_be_bytes());
    out.extend_from_slice(&[0x0F, 0xF0, 0x0F, 0xF0, 0x0F, 0xF0, 0x0F, 0xF0, 0x00]);
    out.extend_from_slice(&1u16.to_be_bytes());
    for (tag, text) in [
        (b'a', "demo;UserID=0XFFFFFFFF"),
        (b'b', "7z020clg400"),
        (b'c', "2026/08/02"),
        (b'd', "11:22:33"),
    ] {
        out.push(tag);
        let body_len = text.len() + 1;
        out.extend_from_slice(&(body_len as u16).to_be_bytes());
        out.extend_from_slice(text.as_bytes());
        out.push(0);
    }
    out.push(b'e');
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Runs the parser and collects every packet.
#[allow(dead_code)]
pub fn collect_packets(data: &[u8]) -> (Vec<Packet>, usize) {
    let mut packets = Vec::new();
    let consumed = packet::parse(data, |pkt| {
        packets.push(pkt.clone());
        true
    })
    .expect("parse failed");
    (packets, consumed)
}
