#![no_main]

use std::collections::VecDeque;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sonora_ring_buffer::RingBuffer;

#[derive(Debug, Arbitrary)]
enum Op {
    Write(Vec<u8>),
    Read(u16),
    Consume(u16),
    Flush,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    /// Capacity is `1 << (size_log2 % 12 + 1)` bytes.
    size_log2: u8,
    ops: Vec<Op>,
}

fuzz_target!(|input: FuzzInput| {
    let size = 1usize << (input.size_log2 % 12 + 1);
    let mut ring = RingBuffer::with_capacity(size).unwrap();
    // Reference model.
    let mut model = VecDeque::new();

    for op in input.ops {
        match op {
            Op::Write(data) => {
                let written = ring.write(&data);
                assert_eq!(written, data.len().min(size - 1 - model.len()));
                model.extend(&data[..written]);
            }
            Op::Read(len) => {
                let mut dest = vec![0u8; usize::from(len)];
                let read = ring.read(&mut dest);
                let expected: Vec<u8> = model.drain(..read).collect();
                assert_eq!(&dest[..read], expected.as_slice());
            }
            Op::Consume(len) => {
                let mut dest = vec![0u8; usize::from(len)];
                let mut seen = Vec::new();
                // Take at most half of each run to exercise partial consumption.
                let read = ring.consume(&mut dest, usize::from(len), |src, _| {
                    let take = src.len().div_ceil(2);
                    seen.extend_from_slice(&src[..take]);
                    take
                });
                let expected: Vec<u8> = model.drain(..read).collect();
                assert_eq!(seen, expected);
            }
            Op::Flush => {
                ring.flush();
                model.clear();
            }
        }
        assert_eq!(ring.avail(), model.len());
        assert_eq!(ring.free(), size - 1 - model.len());
    }
});
