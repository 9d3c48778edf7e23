use bytes::Bytes;
use std::collections::VecDeque;

/// Outcome of offering a frame to the gate
#[derive(Debug, PartialEq, Eq)]
pub enum Admission {
    /// Gate is open: forward now
    Forward(Bytes),
    /// Held until the gate opens
    Queued,
    /// Queue full, frame dropped
    Overflow,
    /// Gate failed: the transcriber will never accept audio
    Discarded,
}

#[derive(Debug)]
enum GateState {
    Pending(VecDeque<Bytes>),
    Open,
    Failed,
}

/// Latch holding audio back until the transcriber handshake completes.
///
/// Frames offered while pending are released by [`open`](AudioGate::open) in
/// arrival order.
#[derive(Debug)]
pub struct AudioGate {
    state: GateState,
    capacity: usize,
}

impl AudioGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: GateState::Pending(VecDeque::new()),
            capacity,
        }
    }

    pub fn admit(&mut self, frame: Bytes) -> Admission {
        match &mut self.state {
            GateState::Open => Admission::Forward(frame),
            GateState::Failed => Admission::Discarded,
            GateState::Pending(queue) => {
                if queue.len() >= self.capacity {
                    Admission::Overflow
                } else {
                    queue.push_back(frame);
                    Admission::Queued
                }
            }
        }
    }

    /// Open the gate, returning held frames oldest first
    pub fn open(&mut self) -> Vec<Bytes> {
        match std::mem::replace(&mut self.state, GateState::Open) {
            GateState::Pending(queue) => queue.into(),
            GateState::Open => Vec::new(),
            GateState::Failed => {
                self.state = GateState::Failed;
                Vec::new()
            }
        }
    }

    /// Fail the gate, returning how many held frames were discarded
    pub fn fail(&mut self) -> usize {
        match std::mem::replace(&mut self.state, GateState::Failed) {
            GateState::Pending(queue) => queue.len(),
            _ => 0,
        }
    }
}
