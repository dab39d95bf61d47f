#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use packet_io::{AppendContext, PacketExtractResult, PacketExtractor, HEADER_SIZE};

fuzz_target!(|data: &[u8]| {
    // Feed the input through staged appends, extracting after every chunk
    let mut buffer = BytesMut::new();
    let max_data = data.first().map_or(0, |&b| b as usize * 16);

    for chunk in data.chunks(13) {
        let mut context = AppendContext::new(&mut buffer, 16);
        context.buffer()[..chunk.len()].copy_from_slice(chunk);
        let _ = context.commit(chunk.len());

        let before = buffer.len();
        let mut extractor = PacketExtractor::new(&mut buffer, max_data);
        loop {
            let (result, packet) = extractor.try_extract_next_packet();
            match result {
                PacketExtractResult::Success => {
                    let packet = packet.unwrap();
                    assert!(packet.size() >= HEADER_SIZE);
                    assert!(packet.size() <= max_data + HEADER_SIZE);
                }
                PacketExtractResult::InsufficientData => break,
                PacketExtractResult::PacketError => {
                    extractor.consume();
                    return;
                }
            }
        }
        let pending = extractor.pending_size();
        extractor.consume();
        assert_eq!(buffer.len(), before - pending);
    }
});
