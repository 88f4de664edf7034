//! Timer queue ordering and postponement
//!
//! Drives the queue through long pseudo-random operation sequences and checks
//! the invariants after every step: entries stay sorted by deadline, and a
//! postpone/resume cycle leaves every timer's remaining time unchanged.

mod helpers;

use helpers::Player;
use smil_player::{Document, NodeId, TimerId, TimerQueue, TimerTag, Wake};

/// Small deterministic generator so failures reproduce
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn nodes(count: usize) -> (Document, Vec<NodeId>) {
    let mut doc = Document::default();
    let root = doc.root();
    let ids = (0..count)
        .map(|_| doc.create_element(root, "img", &[]).unwrap())
        .collect();
    (doc, ids)
}

fn assert_sorted(queue: &TimerQueue, step: usize) {
    let deadlines: Vec<u64> = queue.iter().map(|t| t.deadline_ms).collect();
    assert!(
        deadlines.windows(2).all(|w| w[0] <= w[1]),
        "unsorted after step {}: {:?}",
        step,
        deadlines
    );
}

#[test]
fn test_queue_stays_sorted_under_random_operations() {
    let (_doc, node_ids) = nodes(4);
    for seed in 1..=20_u64 {
        let mut rng = Lcg(seed);
        let mut queue = TimerQueue::new();
        let mut live: Vec<TimerId> = Vec::new();
        let mut now = 0_u64;

        for step in 0..300 {
            match rng.below(10) {
                0..=4 => {
                    let node = node_ids[rng.below(node_ids.len() as u64) as usize];
                    let delay = rng.below(50) as i64;
                    let (id, _) = queue.schedule(node, delay, TimerTag::Duration, now);
                    live.push(id);
                }
                5..=6 if !live.is_empty() => {
                    let id = live.swap_remove(rng.below(live.len() as u64) as usize);
                    queue.cancel(id, now);
                    assert!(!queue.contains(id));
                }
                7 => {
                    let node = node_ids[rng.below(node_ids.len() as u64) as usize];
                    queue.cancel_node(node, now);
                    live.retain(|id| queue.contains(*id));
                }
                _ => {
                    now += rng.below(1_000);
                    while let Some(fired) = queue.pop_due(now) {
                        assert!(fired.deadline_ms <= now);
                        live.retain(|id| *id != fired.id);
                    }
                }
            }
            assert_sorted(&queue, step);
        }
    }
}

#[test]
fn test_equal_deadlines_fire_in_schedule_order() {
    let (_doc, ids) = nodes(3);
    let mut queue = TimerQueue::new();
    let scheduled: Vec<TimerId> = ids
        .iter()
        .map(|node| queue.schedule(*node, 10, TimerTag::Begin, 0).0)
        .collect();

    let mut fired = Vec::new();
    while let Some(timer) = queue.pop_due(1_000) {
        fired.push(timer.id);
    }
    assert_eq!(fired, scheduled);
}

#[test]
fn test_postpone_round_trip_preserves_remaining_time() {
    let (_doc, node_ids) = nodes(2);
    for seed in 1..=20_u64 {
        let mut rng = Lcg(seed);
        let mut queue = TimerQueue::new();
        let start = rng.below(10_000);
        let ids: Vec<TimerId> = (0..8)
            .map(|i| {
                let node = node_ids[i % node_ids.len()];
                queue
                    .schedule(node, 1 + rng.below(100) as i64, TimerTag::Duration, start)
                    .0
            })
            .collect();

        let paused_at = start + rng.below(100);
        let before: Vec<Option<u64>> =
            ids.iter().map(|id| queue.remaining(*id, paused_at)).collect();

        let (outer, wake) = queue.postpone(paused_at);
        assert_eq!(wake, Wake::Disarm);
        let (inner, _) = queue.postpone(paused_at + 5);
        let idle = 1 + rng.below(60_000);
        assert_eq!(queue.next_deadline(), None);
        assert_eq!(queue.pop_due(u64::MAX), None);

        // inner release alone keeps everything frozen
        let wake = queue.resume(inner, paused_at + idle / 2);
        assert_eq!(wake, Wake::Keep);
        assert!(queue.is_postponed());

        let resumed_at = paused_at + idle;
        let wake = queue.resume(outer, resumed_at);
        assert!(matches!(wake, Wake::Arm { .. }));

        let after: Vec<Option<u64>> =
            ids.iter().map(|id| queue.remaining(*id, resumed_at)).collect();
        assert_eq!(before, after, "seed {}", seed);
        assert_sorted(&queue, 0);
    }
}

#[test]
fn test_document_postpone_resumes_with_same_remaining_time() {
    let mut player = Player::start(r#"<img id="pic" dur="3s"/>"#);
    player.run_until(1_000);

    let token = player.doc.postpone();
    player.run_until(5_000);
    assert_eq!(player.count("stopped", "pic"), 0);

    player.doc.resume(token);
    player.run_until(6_999);
    assert_eq!(player.count("stopped", "pic"), 0);
    player.run_until(7_000);
    assert_eq!(player.position("7000 stopped pic"), 2);
    assert!(player.doc.is_finished());
}

#[test]
fn test_deferred_element_freezes_document_timers() {
    let mut player = Player::start(
        r#"<par id="p"><img id="slow" dur="4s"/><img id="hold" begin="10s"/></par>"#,
    );
    let slow = player.id("slow");
    player.run_until(1_000);
    player.doc.defer(slow).unwrap();
    player.run_until(3_000);
    player.doc.undefer(slow).unwrap();

    player.run_until(5_999);
    assert_eq!(player.count("stopped", "slow"), 0);
    player.run_until(6_000);
    assert_eq!(player.count("stopped", "slow"), 1);
}
