use std::collections::VecDeque;

use crate::description::IceCandidate;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum BufferState {
    /// Remote description not applied yet; discoveries are queued.
    AwaitingRemote,
    /// Queue flushed; discoveries go out immediately.
    Flushed,
    /// Endpoint shut down; discoveries are discarded.
    Closed,
}

/// What the caller must do with a freshly discovered candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Held back until [`CandidateBuffer::take_pending`]. Carries the discovery sequence number.
    Queued(u64),
    /// The remote description is already applied: send it now.
    SendNow(IceCandidate),
    /// The buffer is closed: nothing may be sent any more.
    Dropped(IceCandidate),
}

/// Ordered queue of local candidates awaiting the remote description.
///
/// This type does no I/O; the owner holds it under a mutex and performs the
/// sends it asks for while still holding that mutex, which is what keeps the
/// immediate-send path from overtaking a flush in progress.
#[derive(Debug)]
pub struct CandidateBuffer {
    state: BufferState,
    pending: VecDeque<(u64, IceCandidate)>,
    discovered: u64,
}

impl Default for CandidateBuffer {
    fn default() -> Self {
        Self {
            state: BufferState::AwaitingRemote,
            pending: VecDeque::new(),
            discovered: 0,
        }
    }
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: IceCandidate) -> Disposition {
        match self.state {
            BufferState::AwaitingRemote => {
                let seq = self.discovered;
                self.discovered += 1;
                self.pending.push_back((seq, candidate));
                Disposition::Queued(seq)
            }
            BufferState::Flushed => {
                self.discovered += 1;
                Disposition::SendNow(candidate)
            }
            BufferState::Closed => Disposition::Dropped(candidate),
        }
    }

    /// Drains the queue in discovery order and switches to immediate sends.
    ///
    /// Returns nothing once closed; a second call returns an empty queue.
    pub fn take_pending(&mut self) -> Vec<IceCandidate> {
        if self.state == BufferState::Closed {
            return vec![];
        }
        self.state = BufferState::Flushed;
        self.pending.drain(..).map(|(_, c)| c).collect()
    }

    /// Stops accepting candidates. Returns how many queued candidates were discarded.
    pub fn close(&mut self) -> usize {
        self.state = BufferState::Closed;
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_flushed(&self) -> bool {
        self.state == BufferState::Flushed
    }

    pub fn is_closed(&self) -> bool {
        self.state == BufferState::Closed
    }

    /// Total candidates accepted so far, queued or sent immediately.
    pub fn discovered(&self) -> u64 {
        self.discovered
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cand(s: &str) -> IceCandidate {
        IceCandidate::new(s)
    }

    #[test]
    fn test_queue_until_flush() {
        let mut buffer = CandidateBuffer::new();

        assert_eq!(buffer.push(cand("cand-1")), Disposition::Queued(0));
        assert_eq!(buffer.push(cand("cand-2")), Disposition::Queued(1));
        assert_eq!(buffer.push(cand("cand-3")), Disposition::Queued(2));
        assert_eq!(buffer.len(), 3);
        assert!(!buffer.is_flushed());

        let pending = buffer.take_pending();
        assert_eq!(pending, vec![cand("cand-1"), cand("cand-2"), cand("cand-3")]);
        assert!(buffer.is_empty());
        assert!(buffer.is_flushed());
    }

    #[test]
    fn test_send_now_after_flush() {
        let mut buffer = CandidateBuffer::new();
        assert!(buffer.take_pending().is_empty());

        assert_eq!(
            buffer.push(cand("cand-4")),
            Disposition::SendNow(cand("cand-4"))
        );
        assert!(buffer.is_empty());
        assert!(buffer.take_pending().is_empty());
        assert_eq!(buffer.discovered(), 1);
    }

    #[test]
    fn test_close_discards() {
        let mut buffer = CandidateBuffer::new();
        buffer.push(cand("cand-1"));
        buffer.push(cand("cand-2"));

        assert_eq!(buffer.close(), 2);
        assert!(buffer.is_closed());
        assert_eq!(
            buffer.push(cand("cand-3")),
            Disposition::Dropped(cand("cand-3"))
        );
        assert!(buffer.take_pending().is_empty());
        assert!(buffer.is_closed());
    }

    #[test]
    fn test_close_after_flush() {
        let mut buffer = CandidateBuffer::new();
        buffer.take_pending();
        assert_eq!(buffer.close(), 0);
        assert_eq!(
            buffer.push(cand("cand-1")),
            Disposition::Dropped(cand("cand-1"))
        );
    }
}
