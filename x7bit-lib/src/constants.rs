// Configuration stream constants for Series-7 bitstreams

/// The 32-bit synchronisation word that anchors the packet stream
pub const SYNC_WORD: u32 = 0xAA99_5566;

/// Big-endian byte form of [`SYNC_WORD`], as stored in the file
pub const SYNC_BYTES: [u8; 4] = SYNC_WORD.to_be_bytes();

/// Size of one configuration word (4 bytes)
pub const WORD_SIZE: usize = 4;

/// Size of a packet header (one word)
pub const PACKET_HEADER_SIZE: usize = 4;

/// Length of the magic field that opens a `.bit` header (9 bytes)
pub const BIT_MAGIC_LEN: usize = 9;

/// 16-bit value that closes the `.bit` magic record
pub const BIT_MAGIC_TRAILER: u16 = 0x0001;

/// CTL0 bit flagging an encrypted (AES) bitstream
pub const CTL0_DEC_MASK: u32 = 1 << 6;
