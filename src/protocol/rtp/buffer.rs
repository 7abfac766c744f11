//! Sequence-indexed jitter/reorder ring buffer for RAOP audio packets.
//!
//! Unlike a timestamp-keyed map, `RtpBuffer` is a fixed-capacity ring whose
//! slots are addressed by `sequence % capacity`. Playout doesn't start until
//! enough slots are primed (`Ready`) to absorb ordinary network jitter; a
//! slot that never arrives is declared lost once the playout cursor's age
//! exceeds `loss_deadline` and is concealed with silence rather than waveform
//! interpolation.

use std::time::{Duration, Instant};

/// State of a single ring slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Never written since the last wraparound past this slot.
    Free,
    /// Reserved for a sequence number whose audio hasn't arrived yet.
    Filling,
    /// Holds decoded audio ready to be played out.
    Ready,
    /// Already handed to the player; recycled to `Free` once the cursor
    /// moves past it.
    Played,
}

#[derive(Debug, Clone)]
struct Slot {
    state: SlotState,
    sequence: u16,
    data: Vec<u8>,
    filling_since: Option<Instant>,
}

impl Slot {
    fn empty() -> Self {
        Self {
            state: SlotState::Free,
            sequence: 0,
            data: Vec::new(),
            filling_since: None,
        }
    }
}

/// Statistics snapshot, useful for logging and `BUFFER_STATUS` reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    /// Number of `Ready` slots currently held.
    pub ready: usize,
    /// Number of `Filling` slots currently held (gaps awaiting retransmit).
    pub filling: usize,
    /// Ring capacity.
    pub capacity: usize,
    /// Whether playout has started (priming threshold reached at least once).
    pub primed: bool,
}

/// Sequence-indexed ring buffer absorbing UDP reorder and bounded loss.
pub struct RtpBuffer {
    slots: Vec<Slot>,
    capacity: usize,
    priming_depth: usize,
    loss_deadline: Duration,
    /// Next sequence number the player wants to consume.
    playout_cursor: Option<u16>,
    /// Highest sequence number ever committed or reserved.
    highest_seen: Option<u16>,
    primed: bool,
}

/// Errors returned by `RtpBuffer` operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// The sequence is older than the current playout cursor; the packet is
    /// stale and was dropped instead of overwriting a fresher slot.
    #[error("sequence {0} is stale relative to the playout cursor")]
    Stale(u16),
}

/// Default loss deadline as a fraction of the buffer's total time span.
const LOSS_DEADLINE_FRACTION: f64 = 0.8;

/// Number of most-recently-seen sequence numbers excluded from
/// `missing_sequences`, so a retransmit request isn't sent for audio that
/// simply hasn't arrived yet.
const RETRANSMIT_GUARD: u16 = 2;

impl RtpBuffer {
    /// Create a buffer sized for `capacity` packets of `frame_duration` each.
    ///
    /// `priming_depth` is the number of `Ready` slots required before
    /// `take_packet` starts releasing audio; it is clamped to `capacity`.
    #[must_use]
    pub fn new(capacity: usize, priming_depth: usize, frame_duration: Duration) -> Self {
        let loss_deadline = frame_duration.mul_f64(capacity as f64 * LOSS_DEADLINE_FRACTION);

        Self {
            slots: vec![Slot::empty(); capacity.max(1)],
            capacity: capacity.max(1),
            priming_depth: priming_depth.min(capacity.max(1)).max(1),
            loss_deadline,
            playout_cursor: None,
            highest_seen: None,
            primed: false,
        }
    }

    fn index(&self, sequence: u16) -> usize {
        (sequence as usize) % self.capacity
    }

    /// True if `a` is strictly newer than `b`, accounting for 16-bit wraparound.
    fn is_newer(a: u16, b: u16) -> bool {
        let diff = a.wrapping_sub(b);
        diff != 0 && diff < 0x8000
    }

    /// Reserve a slot for an expected sequence number before its data
    /// arrives, e.g. when a gap is first noticed. No-op if already filled.
    pub fn obtain_packet(&mut self, sequence: u16) {
        let idx = self.index(sequence);
        let slot = &mut self.slots[idx];

        if slot.state == SlotState::Free
            || (slot.sequence != sequence && !matches!(slot.state, SlotState::Filling))
        {
            *slot = Slot {
                state: SlotState::Filling,
                sequence,
                data: Vec::new(),
                filling_since: Some(Instant::now()),
            };
        }

        self.note_seen(sequence);
    }

    fn note_seen(&mut self, sequence: u16) {
        self.highest_seen = Some(match self.highest_seen {
            Some(h) if Self::is_newer(h, sequence) => h,
            _ => sequence,
        });
        if self.playout_cursor.is_none() {
            self.playout_cursor = Some(sequence);
        }
    }

    /// Commit decoded audio for `sequence` into the ring.
    ///
    /// # Errors
    /// Returns `BufferError::Stale` if `sequence` is older than the current
    /// playout cursor and would never be played.
    pub fn commit_packet(&mut self, sequence: u16, data: Vec<u8>) -> Result<(), BufferError> {
        if let Some(cursor) = self.playout_cursor {
            if Self::is_newer(cursor, sequence) && cursor != sequence {
                return Err(BufferError::Stale(sequence));
            }
        }

        let idx = self.index(sequence);
        self.slots[idx] = Slot {
            state: SlotState::Ready,
            sequence,
            data,
            filling_since: None,
        };

        self.note_seen(sequence);

        if !self.primed && self.ready_count() >= self.priming_depth {
            self.primed = true;
        }

        Ok(())
    }

    fn ready_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state == SlotState::Ready)
            .count()
    }

    /// Take the next packet in sequence order for playout.
    ///
    /// Returns `None` if priming hasn't completed yet, or if the next slot
    /// is still `Filling` and hasn't exceeded its loss deadline.
    ///
    /// Once a `Filling` slot's age exceeds the configured loss deadline it
    /// is conceded as lost and `Some(None)`-equivalent silence is returned
    /// via `Ok(Vec::new())`... concretely: `Some(Vec::new())`.
    pub fn take_packet(&mut self) -> Option<Vec<u8>> {
        if !self.primed {
            return None;
        }

        let cursor = self.playout_cursor?;
        let idx = self.index(cursor);
        let slot = &self.slots[idx];

        match slot.state {
            SlotState::Ready if slot.sequence == cursor => {
                let data = std::mem::take(&mut self.slots[idx].data);
                self.slots[idx].state = SlotState::Played;
                self.playout_cursor = Some(cursor.wrapping_add(1));
                Some(data)
            }
            SlotState::Filling if slot.sequence == cursor => {
                let expired = slot
                    .filling_since
                    .is_some_and(|t| t.elapsed() >= self.loss_deadline);
                if expired {
                    self.slots[idx] = Slot::empty();
                    self.playout_cursor = Some(cursor.wrapping_add(1));
                    Some(Vec::new())
                } else {
                    None
                }
            }
            _ => {
                // Nothing reserved for this sequence at all (never arrived,
                // no retransmit requested yet). Wait rather than stall
                // forever only if we've never seen anything past it.
                None
            }
        }
    }

    /// Sequence numbers between the playout cursor and the highest sequence
    /// committed so far that are neither `Ready` nor `Played` — i.e. gaps a
    /// retransmit request should be sent for.
    ///
    /// The `RETRANSMIT_GUARD` most recent sequence numbers are never
    /// reported missing even if still `Filling`, since they may simply not
    /// have arrived yet; requesting them would race the sender's own
    /// transmission.
    #[must_use]
    pub fn missing_sequences(&self) -> Vec<u16> {
        let (Some(cursor), Some(highest)) = (self.playout_cursor, self.highest_seen) else {
            return Vec::new();
        };

        let guard_boundary = highest.wrapping_sub(RETRANSMIT_GUARD.saturating_sub(1));

        let mut missing = Vec::new();
        let mut seq = cursor;
        loop {
            let idx = self.index(seq);
            let slot = &self.slots[idx];
            let within_guard = seq == guard_boundary || Self::is_newer(seq, guard_boundary);
            if slot.sequence == seq && matches!(slot.state, SlotState::Ready | SlotState::Played) {
                // present
            } else if Self::is_newer(seq, highest) {
                break;
            } else if !within_guard {
                missing.push(seq);
            }

            if seq == highest {
                break;
            }
            seq = seq.wrapping_add(1);
        }

        missing
    }

    /// Flush the buffer: drop all buffered audio and resume playout at
    /// `resume_from`, as RAOP's FLUSH/RTP-Info does.
    pub fn flush(&mut self, resume_from: u16) {
        for slot in &mut self.slots {
            *slot = Slot::empty();
        }
        self.playout_cursor = Some(resume_from);
        self.highest_seen = Some(resume_from);
        self.primed = false;
    }

    /// Tear down the buffer entirely, as on session TEARDOWN.
    pub fn teardown(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::empty();
        }
        self.playout_cursor = None;
        self.highest_seen = None;
        self.primed = false;
    }

    /// Current buffer statistics.
    #[must_use]
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            ready: self.ready_count(),
            filling: self
                .slots
                .iter()
                .filter(|s| s.state == SlotState::Filling)
                .count(),
            capacity: self.capacity,
            primed: self.primed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(capacity: usize, priming: usize) -> RtpBuffer {
        RtpBuffer::new(capacity, priming, Duration::from_millis(8))
    }

    #[test]
    fn priming_withholds_playout_until_depth_reached() {
        let mut b = buf(8, 4);
        for seq in 0..3 {
            b.commit_packet(seq, vec![seq as u8]).unwrap();
        }
        assert!(b.take_packet().is_none());

        b.commit_packet(3, vec![3]).unwrap();
        assert_eq!(b.take_packet(), Some(vec![0]));
    }

    #[test]
    fn take_packet_releases_in_order() {
        let mut b = buf(8, 1);
        b.commit_packet(5, vec![5]).unwrap();
        b.commit_packet(6, vec![6]).unwrap();
        b.commit_packet(7, vec![7]).unwrap();

        assert_eq!(b.take_packet(), Some(vec![5]));
        assert_eq!(b.take_packet(), Some(vec![6]));
        assert_eq!(b.take_packet(), Some(vec![7]));
    }

    #[test]
    fn missing_sequences_reports_gap() {
        let mut b = buf(16, 1);
        b.commit_packet(10, vec![10]).unwrap();
        b.commit_packet(13, vec![13]).unwrap();

        // The two most recent sequences (12, 13) are within the
        // retransmit guard and never reported, even though 12 is a gap.
        assert_eq!(b.missing_sequences(), vec![11]);
    }

    #[test]
    fn missing_sequences_excludes_guard_band_near_newest() {
        let mut b = buf(32, 1);
        b.commit_packet(10, vec![10]).unwrap();
        b.commit_packet(16, vec![16]).unwrap();

        // 11..=14 are old enough to be requested; 15 falls inside the
        // two-sequence guard band below the newest commit (16, 15).
        assert_eq!(b.missing_sequences(), vec![11, 12, 13, 14]);
    }

    #[test]
    fn missing_sequences_handles_wraparound() {
        let mut b = buf(16, 1);
        b.commit_packet(65530, vec![1]).unwrap();
        b.commit_packet(1, vec![2]).unwrap();

        // 65531..=65535 and 0 are the gap; the guard band excludes only
        // the sequence immediately below the newest commit (1), i.e. 0.
        let missing = b.missing_sequences();
        assert_eq!(missing, vec![65531, 65532, 65533, 65534, 65535]);
    }

    #[test]
    fn stale_commit_is_rejected() {
        let mut b = buf(8, 1);
        b.commit_packet(10, vec![10]).unwrap();
        let _ = b.take_packet();
        assert_eq!(b.commit_packet(10, vec![10]), Err(BufferError::Stale(10)));
    }

    #[test]
    fn flush_resets_cursor() {
        let mut b = buf(8, 1);
        b.commit_packet(5, vec![5]).unwrap();
        b.flush(100);

        assert!(b.missing_sequences().is_empty());
        assert!(!b.stats().primed);
    }

    #[test]
    fn filling_slot_concealed_as_silence_after_deadline() {
        let mut b = RtpBuffer::new(4, 1, Duration::from_millis(0));
        b.obtain_packet(0);
        // loss_deadline is 0 with priming_depth 1, but priming requires a
        // Ready slot; commit a later packet to reach priming depth first.
        b.commit_packet(1, vec![1]).unwrap();
        assert!(b.stats().primed);

        // cursor still at 0 (first seen), which is Filling and immediately expired.
        let result = b.take_packet();
        assert_eq!(result, Some(Vec::new()));
    }
}
