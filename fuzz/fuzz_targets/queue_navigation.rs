#![no_main]

use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use ytmusic::model::Track;
use ytmusic::queue::Queue;

fuzz_target!(|data: &[u8]| {
    let seed = data.first().copied().unwrap_or_default();
    let mut queue = Queue::with_rng(SmallRng::seed_from_u64(u64::from(seed)));
    let mut next_id = 0_usize;

    for byte in data.iter().skip(1) {
        match byte % 9 {
            0 => {
                let count = usize::from(byte / 9 % 4) + 1;
                let tracks = (0..count)
                    .map(|offset| {
                        let id = format!("t{}", next_id + offset);
                        Track::new(&id, &id, "fuzz", u32::from(*byte))
                    })
                    .collect();
                next_id += count;
                queue.add_tracks(tracks);
            }
            1 => {
                let _ = queue.next_track();
            }
            2 => {
                let _ = queue.previous_track();
            }
            3 => {
                let _ = queue.play_track(usize::from(byte / 9));
            }
            4 => queue.toggle_shuffle_mode(),
            5 => {
                let _ = queue.cycle_repeat_mode();
            }
            6 => {
                let peeked = queue.peek_next().map(|track| track.id.clone());
                let moved = queue.next_track().map(|track| track.id.clone());
                assert_eq!(peeked, moved);
            }
            7 => queue.clear(),
            _ => {
                let peeked = queue.peek_previous().map(|track| track.id.clone());
                let moved = queue.previous_track().map(|track| track.id.clone());
                assert_eq!(peeked, moved);
            }
        }

        if let Some(current) = queue.current_index() {
            assert!(current < queue.len());
        }
        if queue.shuffle_mode() {
            assert_eq!(queue.shuffle_order().len(), queue.len());
        }
        assert!(queue.history().iter().all(|idx| *idx < queue.len()));
    }
});
