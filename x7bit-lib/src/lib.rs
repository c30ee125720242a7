//! Parsing, inspection, and editing of Xilinx Series-7 / Zynq-7000 FPGA
//! bitstream files: `.bit`/`.bin` loading, packet-level decoding with
//! substream support, frame data bit access with the 32-bit word swap
//! handled internally, CRC recomputation, and a device catalogue.

pub mod bitstream;
pub mod constants;
pub mod crc;
pub mod device;
pub mod error;
pub mod header;
pub mod packet;

pub use bitstream::Bitstream;
pub use error::X7Error;
pub use header::{BitHeader, Format};
pub use packet::{Opcode, Packet, PacketReader, PacketType, Reg};
