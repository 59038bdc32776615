//! Named one-shot timers.
//!
//! Each logical timeout gets its own handle; re-arming is always
//! cancel-then-set, so a handle never holds two deadlines. The scheduler
//! only needs the earliest armed deadline and re-queries after every
//! dispatch.

use crate::time::Timestamp;

/// One handle per logical timeout a node runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Next single/dual-metric routing advertisement.
    Routing,
    /// Next sequenced full-table dump.
    DsdvFull,
    /// Pending sequenced triggered (incremental) update.
    DsdvTriggered,
    /// Next own data packet.
    Data,
    /// Next relay send slot.
    Forward,
    /// Next routing-table expiry sweep.
    Expiry,
    /// This node's scheduled failure, armed at most once.
    Failure,
}

const TIMER_COUNT: usize = 7;

impl TimerKind {
    const ALL: [TimerKind; TIMER_COUNT] = [
        TimerKind::Routing,
        TimerKind::DsdvFull,
        TimerKind::DsdvTriggered,
        TimerKind::Data,
        TimerKind::Forward,
        TimerKind::Expiry,
        TimerKind::Failure,
    ];

    fn index(self) -> usize {
        match self {
            TimerKind::Routing => 0,
            TimerKind::DsdvFull => 1,
            TimerKind::DsdvTriggered => 2,
            TimerKind::Data => 3,
            TimerKind::Forward => 4,
            TimerKind::Expiry => 5,
            TimerKind::Failure => 6,
        }
    }
}

/// The full timer set of one node.
#[derive(Debug, Default)]
pub struct Timers {
    deadlines: [Option<Timestamp>; TIMER_COUNT],
}

impl Timers {
    pub fn new() -> Self {
        Timers::default()
    }

    /// Arm (or re-arm) a handle. Any previous deadline is replaced.
    pub fn arm(&mut self, kind: TimerKind, at: Timestamp) {
        self.deadlines[kind.index()] = Some(at);
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.deadlines[kind.index()] = None;
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<Timestamp> {
        self.deadlines[kind.index()]
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.deadlines[kind.index()].is_some()
    }

    /// Pop the handle if its deadline has arrived.
    pub fn take_due(&mut self, kind: TimerKind, now: Timestamp) -> bool {
        match self.deadlines[kind.index()] {
            Some(at) if at <= now => {
                self.deadlines[kind.index()] = None;
                true
            }
            _ => false,
        }
    }

    /// Earliest armed deadline across all handles.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        TimerKind::ALL
            .iter()
            .filter_map(|k| self.deadlines[k.index()])
            .min()
    }
}
