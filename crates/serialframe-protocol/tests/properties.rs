//! Property tests for stripping and chunk-split independence.

use proptest::prelude::*;
use serialframe_protocol::{Accumulator, FrameQueue, FramingConfig};

const LEADING: &[u8] = b"\r\n";

fn accumulator() -> Accumulator {
    Accumulator::new(&FramingConfig::default().with_capacity(4096).with_chunk_size(4096))
}

/// Splits `data` at the given cut points (taken modulo its length).
fn split_at_points(data: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut points: Vec<usize> = cuts
        .iter()
        .map(|c| if data.is_empty() { 0 } else { c % data.len() })
        .collect();
    points.push(0);
    points.push(data.len());
    points.sort_unstable();
    points.dedup();
    points.windows(2).map(|w| data[w[0]..w[1]].to_vec()).collect()
}

proptest! {
    #[test]
    fn strip_is_a_no_op_without_leading_separator(
        first in any::<u8>().prop_filter("not a separator", |b| !LEADING.contains(b)),
        rest in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let mut acc = accumulator();
        let mut data = vec![first];
        data.extend_from_slice(&rest);
        acc.ingest(&data);

        prop_assert_eq!(acc.strip_leading(LEADING), 0);
        prop_assert_eq!(acc.as_slice(), &data[..]);
    }

    #[test]
    fn strip_is_idempotent(data in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut acc = accumulator();
        acc.ingest(&data);
        acc.strip_leading(LEADING);
        let once = acc.as_slice().to_vec();

        prop_assert_eq!(acc.strip_leading(LEADING), 0);
        prop_assert_eq!(acc.as_slice(), &once[..]);
    }

    #[test]
    fn queue_order_is_independent_of_chunking(
        cuts in proptest::collection::vec(any::<usize>(), 0..8),
    ) {
        let stream = b"AT+A\rAT+B\r\nAT+C\r";
        let mut acc = accumulator();
        let mut queue = FrameQueue::new();

        for chunk in split_at_points(stream, &cuts) {
            acc.ingest(&chunk);
            acc.drain_frames(LEADING, b"\r", &mut queue);
        }

        let frames: Vec<Vec<u8>> = std::iter::from_fn(|| queue.pop())
            .map(|f| f.into_bytes())
            .collect();
        prop_assert_eq!(frames, vec![b"AT+A".to_vec(), b"AT+B".to_vec(), b"AT+C".to_vec()]);
    }

    #[test]
    fn extraction_never_loops_on_front_boundary(repeats in 1usize..50) {
        let mut acc = accumulator();
        acc.ingest(b"##payload");
        for _ in 0..repeats {
            prop_assert!(acc.extract_frame(LEADING, b"##").is_none());
        }
        prop_assert_eq!(acc.as_slice(), b"##payload");
    }
}
