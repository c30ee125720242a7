//! Tests for packet-level decoding

mod common;

use common::*;

#[test]
fn test_minimal_stream_packet_sequence() {
    let data = minimal_stream(IDCODE_XC7Z020);
    let (packets, _) = collect_packets(&data);

    assert_eq!(packets.len(), 3);

    // NOP directly after the sync word
    assert_eq!(packets[0].packet_type, PacketType::Type1);
    assert_eq!(packets[0].op, Opcode::Nop);
    assert_eq!(packets[0].word_count, 0);
    assert_eq!(packets[0].offset, 0);
    assert_eq!(packets[0].storage_offset, 8);

    // IDCODE write
    assert_eq!(packets[1].op, Opcode::Write);
    assert_eq!(packets[1].reg, Some(Reg::Idcode));
    assert_eq!(packets[1].word_count, 1);
    assert_eq!(packets[1].payload_start, 16);
    assert_eq!(packets[1].payload_end, 20);

    // DESYNC command write
    assert_eq!(packets[2].reg, Some(Reg::Cmd));
    assert_eq!(packets[2].word_count, 1);
}

#[test]
fn test_type2_inherits_from_type1() {
    let frame_words = [0u32; 8];
    let data = frame_stream(IDCODE_XC7Z020, &frame_words, 0);
    let (packets, _) = collect_packets(&data);

    let type2: Vec<&Packet> = packets
        .iter()
        .filter(|p| p.packet_type == PacketType::Type2)
        .collect();
    assert_eq!(type2.len(), 1);
    assert_eq!(type2[0].op, Opcode::Write);
    assert_eq!(type2[0].reg, Some(Reg::Fdri));
    assert_eq!(type2[0].word_count, 8);
    assert_eq!(type2[0].payload_len(), 32);

    // every Type-2 mirrors the most recent Type-1 of its substream
    for (i, pkt) in packets.iter().enumerate() {
        if pkt.packet_type == PacketType::Type2 {
            let prev = packets[..i]
                .iter()
                .rev()
                .find(|p| p.packet_type == PacketType::Type1 && p.stream_index == pkt.stream_index)
                .expect("type-2 without preceding type-1");
            assert_eq!(pkt.op, prev.op);
            assert_eq!(pkt.reg, prev.reg);
        }
    }
}

#[test]
fn test_type2_without_type1_defaults() {
    // sync word immediately followed by a bare Type-2 header
    let mut data = Vec::new();
    push_word(&mut data, SYNC);
    push_word(&mut data, type2(0, 0));
    let (packets, _) = collect_packets(&data);

    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].op, Opcode::Nop);
    assert_eq!(packets[0].reg, None);
}

#[test]
fn test_parser_completeness() {
    // the consumed count equals packet bytes plus the sync-search gaps
    let data = minimal_stream(IDCODE_XC7Z020);
    let (packets, consumed) = collect_packets(&data);

    let packet_bytes: usize = packets.iter().map(|p| 4 + p.payload_len()).sum();
    let gap = 8; // dummy word + sync word
    assert_eq!(packet_bytes + gap, consumed);
    assert_eq!(consumed, data.len());
}

#[test]
fn test_no_sync_word() {
    let data = hex_to_bytes("ffffffff20000000ffffffff");
    let result = packet::parse(&data, |_| true);
    assert!(matches!(result, Err(X7Error::SyncNotFound)));
}

#[test]
fn test_unknown_packet_type() {
    let mut data = Vec::new();
    push_word(&mut data, SYNC);
    push_word(&mut data, 0x6000_0000); // type 3 is reserved
    let result = packet::parse(&data, |_| true);
    match result {
        Err(X7Error::UnknownPacketType {
            packet_type,
            offset,
        }) => {
            assert_eq!(packet_type, 3);
            assert_eq!(offset, 4);
        }
        other => panic!("expected UnknownPacketType, got {other:?}"),
    }
}

#[test]
fn test_truncated_payload() {
    let mut data = Vec::new();
    push_word(&mut data, SYNC);
    push_word(&mut data, type1(OP_WRITE, REG_IDCODE, 2));
    push_word(&mut data, 0x1234_5678); // one of two payload words
    let result = packet::parse(&data, |_| true);
    assert!(matches!(
        result,
        Err(X7Error::TruncatedPacket { offset: 4 })
    ));
}

#[test]
fn test_truncated_header() {
    let mut data = Vec::new();
    push_word(&mut data, SYNC);
    data.extend_from_slice(&[0x30, 0x01]); // half a header word
    let result = packet::parse(&data, |_| true);
    assert!(matches!(result, Err(X7Error::TruncatedPacket { .. })));
}

#[test]
fn test_callback_stop() {
    let data = minimal_stream(IDCODE_XC7Z020);
    let mut seen = 0;
    let consumed = packet::parse(&data, |_| {
        seen += 1;
        seen < 2
    })
    .expect("parse failed");

    assert_eq!(seen, 2);
    // cursor stops right after the second packet (the IDCODE write)
    assert_eq!(consumed, 20);
}

#[test]
fn test_packet_reader_pull_interface() {
    let data = minimal_stream(IDCODE_XC7Z020);
    let sync_end = packet::find_sync(&data, 0).expect("no sync");
    let mut reader = PacketReader::new(&data[sync_end..], sync_end, 0);

    let first = reader.next().expect("no packet").expect("decode failed");
    assert_eq!(first.op, Opcode::Nop);

    let rest: Result<Vec<Packet>, X7Error> = reader.by_ref().collect();
    assert_eq!(rest.expect("decode failed").len(), 2);
    // DESYNC terminates the substream
    assert!(reader.next().is_none());
    assert_eq!(sync_end + reader.consumed(), data.len());
}
