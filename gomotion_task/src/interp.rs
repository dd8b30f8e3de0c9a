//! The interp list (§4.6, §9 redesign): a bounded FIFO of pre-tokenized
//! records bridging program execution to the Trajectory and Tool Loops.
//! Not literally unbounded as an NC interpreter's read-ahead buffer might
//! be — capacity is [`INTERP_LIST_CAPACITY`], and the producer
//! (`program.rs`) is expected to back off once [`InterpList::is_half_full`]
//! so the queue never actually fills (§4.6 "back-pressure engages at half
//! capacity").

use std::collections::VecDeque;

use gomotion_common::consts::INTERP_LIST_CAPACITY;
use gomotion_common::pose::Pose;

/// One tokenized program step (§4.6 "delay / wait-for-motion /
/// wait-for-tool / move / tool-cmd").
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InterpRecord {
    Delay(f64),
    WaitMotion,
    WaitTool,
    MoveJoint { joints: [f64; gomotion_common::consts::MAX_JOINTS], n: usize, time_override: Option<f64> },
    MoveWorld { pose: Pose, time_override: Option<f64> },
    ToolOn { id: u32, value: f64 },
    ToolOff { id: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InterpError {
    #[error("interp list is full (capacity {capacity})")]
    Full { capacity: usize },
}

/// Bounded FIFO of [`InterpRecord`]s.
#[derive(Default)]
pub struct InterpList {
    records: VecDeque<InterpRecord>,
}

impl InterpList {
    pub fn new() -> Self {
        Self { records: VecDeque::with_capacity(INTERP_LIST_CAPACITY) }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `true` once at or above half of [`INTERP_LIST_CAPACITY`] — the
    /// signal a producer should stop reading ahead (§4.6).
    pub fn is_half_full(&self) -> bool {
        self.records.len() * 2 >= INTERP_LIST_CAPACITY
    }

    pub fn push(&mut self, record: InterpRecord) -> Result<(), InterpError> {
        if self.records.len() >= INTERP_LIST_CAPACITY {
            return Err(InterpError::Full { capacity: INTERP_LIST_CAPACITY });
        }
        self.records.push_back(record);
        Ok(())
    }

    pub fn front(&self) -> Option<&InterpRecord> {
        self.records.front()
    }

    pub fn pop_front(&mut self) -> Option<InterpRecord> {
        self.records.pop_front()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_drain_preserves_order() {
        let mut l = InterpList::new();
        l.push(InterpRecord::Delay(1.0)).unwrap();
        l.push(InterpRecord::WaitMotion).unwrap();
        assert_eq!(l.pop_front(), Some(InterpRecord::Delay(1.0)));
        assert_eq!(l.pop_front(), Some(InterpRecord::WaitMotion));
        assert!(l.is_empty());
    }

    #[test]
    fn half_full_threshold() {
        let mut l = InterpList::new();
        for _ in 0..(INTERP_LIST_CAPACITY / 2) {
            l.push(InterpRecord::WaitMotion).unwrap();
        }
        assert!(l.is_half_full());
    }

    #[test]
    fn full_list_rejects_push() {
        let mut l = InterpList::new();
        for _ in 0..INTERP_LIST_CAPACITY {
            l.push(InterpRecord::WaitMotion).unwrap();
        }
        assert!(matches!(l.push(InterpRecord::WaitMotion), Err(InterpError::Full { .. })));
    }
}
