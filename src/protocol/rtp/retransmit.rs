//! Apple's non-standard retransmit-request datagram.
//!
//! This isn't RTCP: it's an 8-byte packet sent from the receiver back to the
//! sender's control port whenever the jitter buffer notices a gap it hasn't
//! given up on yet.
//!
//! Wire layout:
//! ```text
//! byte 0:    0x80                     (V=2, P=0, X=0, CC=0)
//! byte 1:    0x80 | 0x55               (M=1, PT=RetransmitRequest)
//! bytes 2-3: sequence number, always 1 for this datagram
//! bytes 4-5: first missing sequence number
//! bytes 6-7: count of missing packets requested, starting at the first
//! ```

use thiserror::Error;

use super::packet::PayloadType;

/// Size in bytes of a retransmit-request datagram.
pub const RETRANSMIT_REQUEST_SIZE: usize = 8;

/// A retransmit (NACK) request for a contiguous run of missing sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetransmitRequest {
    /// First missing sequence number.
    pub first_missing: u16,
    /// Number of consecutive sequence numbers being requested, starting at
    /// `first_missing`.
    pub count: u16,
}

/// Errors decoding a retransmit-request datagram.
#[derive(Debug, Error)]
pub enum RetransmitDecodeError {
    #[error("buffer too small: need {RETRANSMIT_REQUEST_SIZE} bytes, have {0}")]
    BufferTooSmall(usize),

    #[error("not a retransmit-request datagram (payload type byte 0x{0:02x})")]
    WrongPayloadType(u8),
}

impl RetransmitRequest {
    /// Encode as the 8-byte datagram Apple senders expect.
    #[must_use]
    pub fn encode(&self) -> [u8; RETRANSMIT_REQUEST_SIZE] {
        let mut buf = [0u8; RETRANSMIT_REQUEST_SIZE];
        buf[0] = 0x80;
        buf[1] = 0x80 | (PayloadType::RetransmitRequest as u8);
        buf[2..4].copy_from_slice(&1u16.to_be_bytes());
        buf[4..6].copy_from_slice(&self.first_missing.to_be_bytes());
        buf[6..8].copy_from_slice(&self.count.to_be_bytes());
        buf
    }

    /// Decode from an inbound datagram.
    ///
    /// # Errors
    /// Returns an error if the buffer is too small or the payload type byte
    /// doesn't mark this as a retransmit request.
    pub fn decode(buf: &[u8]) -> Result<Self, RetransmitDecodeError> {
        if buf.len() < RETRANSMIT_REQUEST_SIZE {
            return Err(RetransmitDecodeError::BufferTooSmall(buf.len()));
        }

        let pt = buf[1] & 0x7F;
        if pt != PayloadType::RetransmitRequest as u8 {
            return Err(RetransmitDecodeError::WrongPayloadType(pt));
        }

        Ok(Self {
            first_missing: u16::from_be_bytes([buf[4], buf[5]]),
            count: u16::from_be_bytes([buf[6], buf[7]]),
        })
    }

    /// Split `missing` sequence numbers (as produced by a jitter buffer's
    /// gap scan) into one or more contiguous-run requests. Consecutive
    /// sequences coalesce into a single request; a gap in the gap list
    /// starts a new one.
    #[must_use]
    pub fn coalesce(missing: &[u16]) -> Vec<Self> {
        let mut requests = Vec::new();
        let mut iter = missing.iter().copied().peekable();

        while let Some(start) = iter.next() {
            let mut count = 1u16;
            let mut last = start;
            while let Some(&next) = iter.peek() {
                if next == last.wrapping_add(1) {
                    last = next;
                    count += 1;
                    iter.next();
                } else {
                    break;
                }
            }
            requests.push(Self {
                first_missing: start,
                count,
            });
        }

        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_matches_apple_wire_format() {
        let req = RetransmitRequest {
            first_missing: 10,
            count: 3,
        };
        let encoded = req.encode();

        assert_eq!(encoded[0], 0x80);
        assert_eq!(encoded[1], 0x80 | 0x55);
        assert_eq!(&encoded[2..4], &1u16.to_be_bytes());
        assert_eq!(&encoded[4..6], &10u16.to_be_bytes());
        assert_eq!(&encoded[6..8], &3u16.to_be_bytes());
    }

    #[test]
    fn round_trips() {
        let req = RetransmitRequest {
            first_missing: 65530,
            count: 10,
        };
        let decoded = RetransmitRequest::decode(&req.encode()).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn decode_rejects_short_buffer() {
        let buf = [0u8; 4];
        assert!(matches!(
            RetransmitRequest::decode(&buf),
            Err(RetransmitDecodeError::BufferTooSmall(4))
        ));
    }

    #[test]
    fn decode_rejects_wrong_payload_type() {
        let mut req = RetransmitRequest {
            first_missing: 1,
            count: 1,
        }
        .encode();
        req[1] = 0x80 | 0x60; // AudioData, not a retransmit request
        assert!(matches!(
            RetransmitRequest::decode(&req),
            Err(RetransmitDecodeError::WrongPayloadType(0x60))
        ));
    }

    #[test]
    fn coalesce_merges_consecutive_runs() {
        let missing = [10, 11, 12, 20, 21, 30];
        let requests = RetransmitRequest::coalesce(&missing);

        assert_eq!(
            requests,
            vec![
                RetransmitRequest {
                    first_missing: 10,
                    count: 3
                },
                RetransmitRequest {
                    first_missing: 20,
                    count: 2
                },
                RetransmitRequest {
                    first_missing: 30,
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn coalesce_handles_wraparound_run() {
        let missing = [65534, 65535, 0, 1];
        let requests = RetransmitRequest::coalesce(&missing);

        assert_eq!(
            requests,
            vec![RetransmitRequest {
                first_missing: 65534,
                count: 4
            }]
        );
    }

    #[test]
    fn coalesce_empty_input() {
        assert!(RetransmitRequest::coalesce(&[]).is_empty());
    }
}
