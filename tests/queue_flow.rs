use rand::SeedableRng;
use rand::rngs::SmallRng;
use ytmusic::model::{RepeatMode, Track};
use ytmusic::queue::Queue;

fn abc() -> Queue {
    let mut queue = Queue::with_rng(SmallRng::seed_from_u64(3));
    queue.set_tracks(vec![
        Track::new("A", "Alpha", "X", 100),
        Track::new("B", "Bravo", "X", 100),
        Track::new("C", "Charlie", "X", 100),
    ]);
    queue
}

fn next_id(queue: &mut Queue) -> Option<String> {
    queue.next_track().map(|track| track.id.clone())
}

#[test]
fn stops_at_end_without_repeat() {
    let mut queue = abc();
    assert_eq!(next_id(&mut queue).as_deref(), Some("B"));
    assert_eq!(next_id(&mut queue).as_deref(), Some("C"));
    assert_eq!(next_id(&mut queue), None);
    assert_eq!(queue.current_index(), Some(2));
}

#[test]
fn repeat_all_wraps_and_records_history() {
    let mut queue = abc();
    queue.set_repeat_mode(RepeatMode::All);
    next_id(&mut queue);
    next_id(&mut queue);
    assert_eq!(next_id(&mut queue).as_deref(), Some("A"));
    assert_eq!(queue.current_index(), Some(0));
    assert_eq!(queue.history(), &[0, 1, 2]);
}

#[test]
fn back_and_forth_through_history() {
    let mut queue = abc();
    queue.play_track(2);
    queue.play_track(1);
    assert_eq!(queue.previous_track().map(|track| track.id.as_str()), Some("C"));
    assert_eq!(queue.previous_track().map(|track| track.id.as_str()), Some("A"));
    assert_eq!(queue.previous_track().map(|track| track.id.as_str()), Some("A"));
}

#[test]
fn history_is_retraced_before_wrapping_back() {
    let mut queue = abc();
    queue.set_repeat_mode(RepeatMode::All);
    queue.play_track(2);
    queue.play_track(0);

    let ids: Vec<String> = (0..3)
        .filter_map(|_| queue.previous_track().map(|track| track.id.clone()))
        .collect();
    assert_eq!(ids, vec!["C", "A", "C"]);
    assert_eq!(queue.current_index(), Some(2));
}

#[test]
fn shuffle_session_visits_every_track_once() {
    let mut queue = abc();
    queue.toggle_shuffle_mode();
    assert_eq!(queue.shuffle_order()[0], 0);

    let mut seen = vec![queue.current_track().map(|track| track.id.clone()).expect("current")];
    while let Some(id) = next_id(&mut queue) {
        seen.push(id);
    }
    seen.sort();
    assert_eq!(seen, vec!["A", "B", "C"]);

    queue.toggle_shuffle_mode();
    assert!(queue.shuffle_order().is_empty());
    assert!(queue.history().is_empty());
}
