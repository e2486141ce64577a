use pulsis::{EventLoop, Handler, Interest, SourceFd, Timeout, Token, TriggerMode};

use std::os::unix::io::RawFd;
use std::thread;
use std::time::{Duration, Instant};

/// Creates a non-blocking pipe for use as a readiness source.
fn pipe() -> (RawFd, RawFd) {
    let mut fds: [RawFd; 2] = [-1; 2];
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0, "pipe(2) failed");

    for fd in fds {
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        assert!(flags >= 0, "fcntl(F_GETFL) failed");
        let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        assert!(rc >= 0, "fcntl(F_SETFL) failed");
    }

    (fds[0], fds[1])
}

fn write_byte(fd: RawFd) {
    assert_eq!(
        unsafe { libc::write(fd, b"x".as_ptr() as *const _, 1) },
        1,
        "write to pipe failed"
    );
}

fn drain(fd: RawFd) {
    let mut buf = [0u8; 64];
    while unsafe { libc::read(fd, buf.as_mut_ptr() as *mut _, buf.len()) } > 0 {}
}

fn close(fd: RawFd) {
    unsafe { libc::close(fd) };
}

struct CountReady {
    count: usize,
}

impl Handler for CountReady {
    type Timeout = ();
    type Message = ();

    fn ready(&mut self, _event_loop: &mut EventLoop<Self>, token: Token, readiness: Interest) {
        assert_eq!(token, Token(1), "only one source is registered");
        assert!(readiness.is_readable(), "the pipe should be readable");
        self.count += 1;
    }
}

#[test]
fn test_edge_fires_once_per_transition() {
    let mut event_loop = EventLoop::new().expect("failed to create event loop");
    let mut handler = CountReady { count: 0 };
    let (rd, wr) = pipe();

    event_loop
        .register(&SourceFd(&rd), Token(1), Interest::READABLE, TriggerMode::Edge)
        .expect("register should succeed");

    write_byte(wr);
    event_loop
        .run_once(&mut handler, Some(Duration::from_millis(100)))
        .expect("cycle should succeed");
    assert_eq!(handler.count, 1, "one byte, one event");

    // The data is still buffered, but there was no new transition.
    event_loop
        .run_once(&mut handler, Some(Duration::from_millis(50)))
        .expect("cycle should succeed");
    assert_eq!(handler.count, 1, "edge mode must not re-fire without new data");

    write_byte(wr);
    event_loop
        .run_once(&mut handler, Some(Duration::from_millis(100)))
        .expect("cycle should succeed");
    assert_eq!(handler.count, 2, "a second byte is one more event, not two");

    close(rd);
    close(wr);
}

#[test]
fn test_level_fires_while_condition_holds() {
    let mut event_loop = EventLoop::new().expect("failed to create event loop");
    let mut handler = CountReady { count: 0 };
    let (rd, wr) = pipe();

    event_loop
        .register(&SourceFd(&rd), Token(1), Interest::READABLE, TriggerMode::Level)
        .expect("register should succeed");

    write_byte(wr);
    for _ in 0..3 {
        event_loop
            .run_once(&mut handler, Some(Duration::from_millis(50)))
            .expect("cycle should succeed");
    }
    assert_eq!(handler.count, 3, "level mode re-fires every cycle until drained");

    drain(rd);
    event_loop
        .run_once(&mut handler, Some(Duration::from_millis(50)))
        .expect("cycle should succeed");
    assert_eq!(handler.count, 3, "a drained source goes quiet");

    close(rd);
    close(wr);
}

#[test]
fn test_oneshot_disarms_until_reregistered() {
    let mut event_loop = EventLoop::new().expect("failed to create event loop");
    let mut handler = CountReady { count: 0 };
    let (rd, wr) = pipe();

    event_loop
        .register(
            &SourceFd(&rd),
            Token(1),
            Interest::READABLE,
            TriggerMode::EdgeOneshot,
        )
        .expect("register should succeed");

    write_byte(wr);
    event_loop
        .run_once(&mut handler, Some(Duration::from_millis(100)))
        .expect("cycle should succeed");
    assert_eq!(handler.count, 1);

    write_byte(wr);
    event_loop
        .run_once(&mut handler, Some(Duration::from_millis(50)))
        .expect("cycle should succeed");
    assert_eq!(handler.count, 1, "a fired oneshot stays disarmed");

    event_loop
        .reregister(
            &SourceFd(&rd),
            Token(1),
            Interest::READABLE,
            TriggerMode::EdgeOneshot,
        )
        .expect("reregister should succeed");
    event_loop
        .run_once(&mut handler, Some(Duration::from_millis(100)))
        .expect("cycle should succeed");
    assert_eq!(handler.count, 2, "reregistering re-arms the source");

    close(rd);
    close(wr);
}

struct OrderRecorder {
    order: Vec<&'static str>,
}

impl Handler for OrderRecorder {
    type Timeout = &'static str;
    type Message = &'static str;

    fn ready(&mut self, _event_loop: &mut EventLoop<Self>, _token: Token, _readiness: Interest) {
        self.order.push("ready");
    }

    fn timeout(&mut self, _event_loop: &mut EventLoop<Self>, payload: &'static str) {
        self.order.push(payload);
    }

    fn notify(&mut self, _event_loop: &mut EventLoop<Self>, msg: &'static str) {
        self.order.push(msg);
    }

    fn tick(&mut self, _event_loop: &mut EventLoop<Self>) {
        self.order.push("tick");
    }
}

#[test]
fn test_dispatch_order_within_cycle() {
    let mut event_loop = EventLoop::new().expect("failed to create event loop");
    let mut handler = OrderRecorder { order: vec![] };
    let (rd, wr) = pipe();

    event_loop
        .register(&SourceFd(&rd), Token(1), Interest::READABLE, TriggerMode::Level)
        .expect("register should succeed");

    write_byte(wr);
    event_loop
        .schedule(Duration::ZERO, "timeout")
        .expect("schedule should succeed");
    event_loop.channel().send("notify").expect("send should succeed");

    event_loop
        .run_once(&mut handler, Some(Duration::from_millis(100)))
        .expect("cycle should succeed");

    assert_eq!(
        handler.order,
        ["ready", "timeout", "notify", "tick"],
        "within one cycle: readiness, then timeouts, then messages, then tick"
    );

    close(rd);
    close(wr);
}

struct TimeoutRecorder {
    fired: Vec<&'static str>,
}

impl Handler for TimeoutRecorder {
    type Timeout = &'static str;
    type Message = ();

    fn timeout(&mut self, event_loop: &mut EventLoop<Self>, payload: &'static str) {
        self.fired.push(payload);

        if self.fired.len() == 2 {
            event_loop.shutdown();
        }
    }
}

#[test]
fn test_timers_fire_in_deadline_order() {
    let mut event_loop = EventLoop::new().expect("failed to create event loop");
    let mut handler = TimeoutRecorder { fired: vec![] };

    event_loop
        .schedule(Duration::from_millis(100), "a")
        .expect("schedule should succeed");
    event_loop
        .schedule(Duration::from_millis(50), "b")
        .expect("schedule should succeed");

    let start = Instant::now();
    event_loop.run(&mut handler).expect("run should succeed");

    assert_eq!(handler.fired, ["b", "a"], "the later-scheduled earlier deadline fires first");
    assert!(
        start.elapsed() >= Duration::from_millis(100),
        "the loop should actually wait for the deadlines"
    );
}

struct CancelInCallback {
    doomed: Option<Timeout>,
    fired: Vec<&'static str>,
    cancel_result: Option<bool>,
}

impl Handler for CancelInCallback {
    type Timeout = &'static str;
    type Message = ();

    fn timeout(&mut self, event_loop: &mut EventLoop<Self>, payload: &'static str) {
        self.fired.push(payload);

        if let Some(timeout) = self.doomed.take() {
            self.cancel_result = Some(event_loop.cancel(timeout));
        }
    }
}

#[test]
fn test_cancel_from_callback_stops_expired_timer() {
    let mut event_loop = EventLoop::new().expect("failed to create event loop");

    event_loop
        .schedule(Duration::from_millis(5), "first")
        .expect("schedule should succeed");
    let doomed = event_loop
        .schedule(Duration::from_millis(10), "second")
        .expect("schedule should succeed");

    let mut handler = CancelInCallback {
        doomed: Some(doomed),
        fired: vec![],
        cancel_result: None,
    };

    // Let both timers expire before the cycle runs, so the cancel
    // races the dispatch of an already-expired entry.
    thread::sleep(Duration::from_millis(30));
    event_loop
        .run_once(&mut handler, Some(Duration::from_millis(50)))
        .expect("cycle should succeed");

    assert_eq!(handler.fired, ["first"], "the cancelled timer must not fire");
    assert_eq!(
        handler.cancel_result,
        Some(true),
        "an expired but undispatched timer is still cancellable"
    );
}

#[test]
fn test_external_shutdown_wakes_blocked_loop() {
    let mut event_loop = EventLoop::new().expect("failed to create event loop");
    let mut handler = OrderRecorder { order: vec![] };
    let handle = event_loop.shutdown_handle();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        let stopped_at = Instant::now();
        handle.shutdown();
        stopped_at
    });

    // No sources, no timers: without the wake this blocks forever.
    event_loop.run(&mut handler).expect("run should succeed");
    let returned_at = Instant::now();

    let stopped_at = stopper.join().expect("stopper thread panicked");

    assert!(
        returned_at.duration_since(stopped_at) < Duration::from_millis(50),
        "shutdown must wake a blocked poll within bounded latency"
    );
    assert!(
        handler.order.is_empty(),
        "no callback may run after shutdown takes effect"
    );
    assert!(!event_loop.is_running(), "the loop is stopped after run returns");
}

struct TickStop {
    was_running: bool,
}

impl Handler for TickStop {
    type Timeout = ();
    type Message = ();

    fn tick(&mut self, event_loop: &mut EventLoop<Self>) {
        self.was_running = event_loop.is_running();
        event_loop.shutdown();
    }
}

#[test]
fn test_tick_runs_every_cycle() {
    let mut event_loop = EventLoop::new().expect("failed to create event loop");
    let mut handler = TickStop { was_running: false };

    // An immediate timer pops the first cycle so tick is reached.
    event_loop
        .schedule(Duration::ZERO, ())
        .expect("schedule should succeed");

    event_loop.run(&mut handler).expect("run should succeed");

    assert!(handler.was_running, "callbacks observe the running state");
    assert!(!event_loop.is_running());
}
