use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::time::Duration;

use crate::clock::{Clock, default_clock};

/// Target cadence of the software fallback: one flush per 60 Hz display
/// refresh interval.
pub const FRAME_INTERVAL_MS: f64 = 1_000.0 / 60.0;

/// Identifier returned by [`FrameScheduler::schedule`].
///
/// Handles are monotonically increasing and never reused within one
/// scheduler instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameHandle(pub u64);

/// A one-shot redraw callback, invoked with the flush timestamp in
/// milliseconds.
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Steady-cadence redraw scheduling, native or software-emulated.
///
/// `schedule` registers a callback for the next frame and returns a handle;
/// `cancel` marks a still-pending callback so the flush skips it. Canceling
/// after the callback already fired is a no-op.
pub trait FrameScheduler {
    fn schedule(&self, callback: FrameCallback) -> FrameHandle;
    fn cancel(&self, handle: FrameHandle);
}

/// Resolve the frame-synchronization implementation for this host.
///
/// Rust hosts expose no native display-synchronized callback primitive to
/// probe for, so the capability detection always resolves to the timer-based
/// [`SoftwareScheduler`].
pub fn default_scheduler() -> SoftwareScheduler {
    SoftwareScheduler::new()
}

struct Entry {
    handle: FrameHandle,
    callback: FrameCallback,
    cancelled: bool,
}

/// Timer-based [`FrameScheduler`] fallback.
///
/// Callbacks accepted since the last flush are queued; the first entry into
/// an empty queue arms a deadline `max(0, 16.67ms − (now − last_flush))` in
/// the future and records the flush timestamp eagerly, so back-to-back
/// scheduling converges on a steady cadence instead of drifting. A flush
/// swaps out the whole queue and invokes every non-cancelled entry in
/// registration order with that timestamp; a panicking callback cannot
/// starve its siblings — the payload is re-raised once the batch completes.
pub struct SoftwareScheduler {
    clock: Box<dyn Clock>,
    queue: RefCell<Vec<Entry>>,
    next_handle: Cell<u64>,
    last_flush_ms: Cell<f64>,
    deadline_ms: Cell<Option<f64>>,
}

impl SoftwareScheduler {
    pub fn new() -> Self {
        Self::with_clock(default_clock())
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            queue: RefCell::new(Vec::new()),
            next_handle: Cell::new(0),
            last_flush_ms: Cell::new(0.0),
            deadline_ms: Cell::new(None),
        }
    }

    /// Timestamp at which the pending batch is due, if one is armed.
    pub fn deadline_ms(&self) -> Option<f64> {
        self.deadline_ms.get()
    }

    /// Number of queued, non-cancelled callbacks.
    pub fn pending(&self) -> usize {
        self.queue.borrow().iter().filter(|e| !e.cancelled).count()
    }

    /// Flush the pending batch now, returning how many callbacks ran.
    ///
    /// Callbacks may re-schedule themselves; those entries land in the next
    /// batch, never the one being flushed. If any callback panicked, the
    /// first payload is re-raised after the whole batch has run.
    pub fn flush(&self) -> usize {
        let Some(timestamp) = self.deadline_ms.take() else {
            return 0;
        };
        let batch = self.queue.replace(Vec::new());

        let mut ran = 0;
        let mut deferred = None;
        for entry in batch {
            if entry.cancelled {
                continue;
            }
            ran += 1;
            let callback = entry.callback;
            if let Err(payload) = catch_unwind(AssertUnwindSafe(move || callback(timestamp))) {
                if deferred.is_none() {
                    deferred = Some(payload);
                } else {
                    tracing::error!(
                        handle = entry.handle.0,
                        "additional frame callback panic dropped"
                    );
                }
            }
        }

        if let Some(payload) = deferred {
            resume_unwind(payload);
        }
        ran
    }

    /// Blocking pump for real clocks: sleep until each deadline, flush,
    /// repeat until no further frame is scheduled.
    ///
    /// Returns once a flush leaves the queue empty, which is how a stopped
    /// engine winds the loop down.
    pub fn run(&self) {
        while let Some(deadline) = self.deadline_ms.get() {
            let now = self.clock.now_ms();
            if deadline > now {
                std::thread::sleep(Duration::from_secs_f64((deadline - now) / 1e3));
            }
            self.flush();
        }
    }
}

impl Default for SoftwareScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler for SoftwareScheduler {
    fn schedule(&self, callback: FrameCallback) -> FrameHandle {
        let mut queue = self.queue.borrow_mut();
        if queue.is_empty() {
            let now = self.clock.now_ms();
            let delay = (FRAME_INTERVAL_MS - (now - self.last_flush_ms.get())).max(0.0);
            let due = now + delay;
            self.last_flush_ms.set(due);
            self.deadline_ms.set(Some(due));
        }

        let handle = FrameHandle(self.next_handle.get() + 1);
        self.next_handle.set(handle.0);
        queue.push(Entry {
            handle,
            callback,
            cancelled: false,
        });
        handle
    }

    fn cancel(&self, handle: FrameHandle) {
        for entry in self.queue.borrow_mut().iter_mut() {
            if entry.handle == handle {
                entry.cancelled = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn scheduler_at(start_ms: f64) -> (SoftwareScheduler, ManualClock) {
        let clock = ManualClock::new();
        clock.set_ms(start_ms);
        let sched = SoftwareScheduler::with_clock(Box::new(clock.clone()));
        (sched, clock)
    }

    #[test]
    fn batch_runs_in_registration_order() {
        let (sched, _clock) = scheduler_at(100.0);
        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..4 {
            let order = Rc::clone(&order);
            sched.schedule(Box::new(move |_| order.borrow_mut().push(i)));
        }
        assert_eq!(sched.flush(), 4);
        assert_eq!(*order.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn handles_are_unique_and_increasing() {
        let (sched, _clock) = scheduler_at(0.0);
        let a = sched.schedule(Box::new(|_| {}));
        let b = sched.schedule(Box::new(|_| {}));
        sched.flush();
        let c = sched.schedule(Box::new(|_| {}));
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn cancel_excludes_exactly_that_callback() {
        let (sched, _clock) = scheduler_at(0.0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut handles = Vec::new();
        for i in 0..3 {
            let order = Rc::clone(&order);
            handles.push(sched.schedule(Box::new(move |_| order.borrow_mut().push(i))));
        }
        sched.cancel(handles[1]);
        assert_eq!(sched.pending(), 2);
        assert_eq!(sched.flush(), 2);
        assert_eq!(*order.borrow(), vec![0, 2]);

        // Canceling after the batch flushed is a no-op.
        sched.cancel(handles[0]);
        assert_eq!(sched.flush(), 0);
    }

    #[test]
    fn cadence_is_steady_and_delay_never_negative() {
        let (sched, clock) = scheduler_at(100.0);

        // First schedule long after the (virtual) last flush: fires immediately.
        sched.schedule(Box::new(|_| {}));
        assert_eq!(sched.deadline_ms(), Some(100.0));
        sched.flush();

        // Re-scheduling right away lands one full interval later.
        sched.schedule(Box::new(|_| {}));
        let next = sched.deadline_ms().unwrap();
        assert!((next - (100.0 + FRAME_INTERVAL_MS)).abs() < 1e-9);
        assert!(next >= clock.now_ms());
    }

    #[test]
    fn callbacks_receive_the_flush_timestamp() {
        let (sched, clock) = scheduler_at(50.0);
        let seen = Rc::new(Cell::new(f64::NAN));
        let seen2 = Rc::clone(&seen);
        sched.schedule(Box::new(move |ts| seen2.set(ts)));
        let deadline = sched.deadline_ms().unwrap();
        clock.set_ms(deadline + 3.0); // timer fires a little late
        sched.flush();
        assert_eq!(seen.get(), deadline);
    }

    #[test]
    fn rescheduling_during_flush_lands_in_next_batch() {
        let (sched, _clock) = scheduler_at(0.0);
        let sched = Rc::new(sched);
        let count = Rc::new(Cell::new(0u32));

        let sched2 = Rc::clone(&sched);
        let count2 = Rc::clone(&count);
        sched.schedule(Box::new(move |_| {
            count2.set(count2.get() + 1);
            let count3 = Rc::clone(&count2);
            sched2.schedule(Box::new(move |_| count3.set(count3.get() + 1)));
        }));

        assert_eq!(sched.flush(), 1);
        assert_eq!(count.get(), 1);
        assert_eq!(sched.pending(), 1);
        assert_eq!(sched.flush(), 1);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn panicking_callback_does_not_starve_siblings() {
        let (sched, _clock) = scheduler_at(0.0);
        let ran = Rc::new(Cell::new(false));
        sched.schedule(Box::new(|_| panic!("bad frame callback")));
        let ran2 = Rc::clone(&ran);
        sched.schedule(Box::new(move |_| ran2.set(true)));

        let result = catch_unwind(AssertUnwindSafe(|| sched.flush()));
        assert!(result.is_err(), "panic payload is re-raised after batch");
        assert!(ran.get(), "sibling callback still ran");
    }
}
