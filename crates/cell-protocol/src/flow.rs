//! Flow commands pushed onto the dispatcher's per-class queues.

use std::cmp::Ordering;

/// Which executor class a command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    Emergency,
    Motion,
    IoA,
    IoB,
    External,
}

impl FlowKind {
    /// Lower rank runs first. `IoA` and `IoB` are equal priority: they run
    /// on independent queues/workers and never contend with each other.
    pub fn priority_rank(self) -> u8 {
        match self {
            FlowKind::Emergency => 0,
            FlowKind::Motion => 1,
            FlowKind::IoA | FlowKind::IoB => 2,
            FlowKind::External => 3,
        }
    }
}

/// A scripted flow identified by a small integer so PLCs can request it by
/// writing to the matching control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowId {
    Pick,
    Unload,
    Assembly,
    Flip,
    Feed,
}

/// A command enqueued by the dispatcher for one executor to run.
#[derive(Debug, Clone)]
pub struct FlowCommand {
    pub kind: FlowKind,
    pub flow: FlowId,
    pub payload: FlowPayload,
    pub enqueue_time_ms: u64,
    pub id: u64,
}

/// Per-flow parameters carried alongside the command. Most flows need none;
/// the ones that do (feed duration, flip actuator set) carry them here
/// rather than re-reading registers mid-flow.
#[derive(Debug, Clone, Default)]
pub struct FlowPayload {
    pub vibration_duration_ms: Option<u64>,
}

impl PartialEq for FlowCommand {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for FlowCommand {}

impl PartialOrd for FlowCommand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FlowCommand {
    /// Emergency < Motion < IoA = IoB < External; ties broken by enqueue
    /// time (earlier first).
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .priority_rank()
            .cmp(&other.kind.priority_rank())
            .then(self.enqueue_time_ms.cmp(&other.enqueue_time_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(kind: FlowKind, t: u64, id: u64) -> FlowCommand {
        FlowCommand {
            kind,
            flow: FlowId::Pick,
            payload: FlowPayload::default(),
            enqueue_time_ms: t,
            id,
        }
    }

    #[test]
    fn emergency_outranks_everything() {
        let e = cmd(FlowKind::Emergency, 100, 1);
        let m = cmd(FlowKind::Motion, 0, 2);
        assert!(e < m);
    }

    #[test]
    fn io_a_and_io_b_are_equal_priority() {
        let a = cmd(FlowKind::IoA, 5, 1);
        let b = cmd(FlowKind::IoB, 5, 2);
        assert_eq!(a.kind.priority_rank(), b.kind.priority_rank());
    }

    #[test]
    fn ties_break_by_enqueue_time() {
        let early = cmd(FlowKind::Motion, 10, 1);
        let late = cmd(FlowKind::Motion, 20, 2);
        assert!(early < late);
    }

    #[test]
    fn external_is_lowest_priority() {
        let ext = cmd(FlowKind::External, 0, 1);
        let motion = cmd(FlowKind::Motion, 1000, 2);
        assert!(motion < ext);
    }
}
