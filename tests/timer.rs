use pulsis::{TimerError, TimerQueue};

use std::time::{Duration, Instant};

#[test]
fn test_next_deadline_is_earliest() {
    let mut queue = TimerQueue::new();
    let base = Instant::now();

    queue
        .schedule_at(base + Duration::from_millis(10), "late")
        .expect("schedule should succeed");
    queue
        .schedule_at(base + Duration::from_millis(5), "early")
        .expect("schedule should succeed");

    assert_eq!(
        queue.next_deadline(),
        Some(base + Duration::from_millis(5)),
        "the earlier deadline should win even when scheduled second"
    );
}

#[test]
fn test_expiry_in_deadline_order() {
    let mut queue = TimerQueue::new();
    let base = Instant::now();

    queue
        .schedule_at(base + Duration::from_millis(100), "a")
        .expect("schedule should succeed");
    queue
        .schedule_at(base + Duration::from_millis(50), "b")
        .expect("schedule should succeed");

    let expired = queue.drain_expired(base + Duration::from_millis(200));
    let order: Vec<&str> = expired.iter().map(|(_, payload)| *payload).collect();

    assert_eq!(order, ["b", "a"], "timers should fire in deadline order");
}

#[test]
fn test_equal_deadlines_fire_in_insertion_order() {
    let mut queue = TimerQueue::new();
    let deadline = Instant::now() + Duration::from_millis(10);

    for payload in ["first", "second", "third"] {
        queue
            .schedule_at(deadline, payload)
            .expect("schedule should succeed");
    }

    let expired = queue.drain_expired(deadline);
    let order: Vec<&str> = expired.iter().map(|(_, payload)| *payload).collect();

    assert_eq!(
        order,
        ["first", "second", "third"],
        "equal deadlines should fire in insertion order"
    );
}

#[test]
fn test_unexpired_timers_stay_queued() {
    let mut queue = TimerQueue::new();
    let base = Instant::now();

    queue
        .schedule_at(base + Duration::from_millis(50), ())
        .expect("schedule should succeed");

    assert!(
        queue.pop_expired(base).is_none(),
        "a future deadline should not pop early"
    );
    assert_eq!(queue.len(), 1, "the timer should still be pending");
}

#[test]
fn test_cancel_before_firing() {
    let mut queue = TimerQueue::new();
    let base = Instant::now();

    let keep = queue
        .schedule_at(base + Duration::from_millis(5), "keep")
        .expect("schedule should succeed");
    let discard = queue
        .schedule_at(base + Duration::from_millis(5), "drop")
        .expect("schedule should succeed");

    assert!(queue.cancel(discard), "cancelling a pending timer succeeds");
    assert!(!queue.cancel(discard), "cancelling twice is a no-op");

    let expired = queue.drain_expired(base + Duration::from_millis(10));

    assert_eq!(expired.len(), 1, "the cancelled timer should not fire");
    assert_eq!(expired[0].0, keep, "the surviving handle should match");
    assert_eq!(expired[0].1, "keep");
}

#[test]
fn test_cancel_after_drain_is_noop() {
    let mut queue = TimerQueue::new();
    let base = Instant::now();

    let timeout = queue
        .schedule_at(base, ())
        .expect("schedule should succeed");

    let expired = queue.drain_expired(base);
    assert_eq!(expired.len(), 1);

    assert!(
        !queue.cancel(timeout),
        "a drained handle counts as fired; cancel reports false"
    );
}

#[test]
fn test_next_deadline_skips_cancelled() {
    let mut queue = TimerQueue::new();
    let base = Instant::now();

    let early = queue
        .schedule_at(base + Duration::from_millis(5), ())
        .expect("schedule should succeed");
    queue
        .schedule_at(base + Duration::from_millis(10), ())
        .expect("schedule should succeed");

    queue.cancel(early);

    assert_eq!(
        queue.next_deadline(),
        Some(base + Duration::from_millis(10)),
        "a cancelled entry should not bound the wait"
    );
}

#[test]
fn test_capacity_overflow() {
    let mut queue = TimerQueue::with_capacity(2);
    let base = Instant::now();

    let first = queue
        .schedule_at(base + Duration::from_millis(1), ())
        .expect("schedule should succeed");
    queue
        .schedule_at(base + Duration::from_millis(2), ())
        .expect("schedule should succeed");

    assert_eq!(
        queue.schedule_at(base + Duration::from_millis(3), ()),
        Err(TimerError::Overflow),
        "the queue should reject timers past its capacity"
    );

    queue.cancel(first);

    queue
        .schedule_at(base + Duration::from_millis(3), ())
        .expect("cancelling should free capacity");
}

#[test]
fn test_empty_queue_has_no_deadline() {
    let mut queue: TimerQueue<()> = TimerQueue::new();

    assert!(queue.is_empty());
    assert_eq!(
        queue.next_deadline(),
        None,
        "no timers means the loop may wait indefinitely"
    );
}
