//! Playback direction state machine of the frame reader.
//!
//! Pure transition logic, no I/O. Positions are file frame indices; the
//! reader turns returned targets into byte seeks.
//!
//! | State | end of data | after a frame |
//! |-------|-------------|---------------|
//! | `Forward` | stop | advance |
//! | `LoopForward` | seek to 0, retry | advance |
//! | `LoopReverse` advancing | start retreating, seek to `pos - 2`, retry | advance |
//! | `LoopReverse` retreating | (not reached) | seek to `pos - 2`, or turn around at 0 |

/// Loop behaviour requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoopMode {
    /// Stop at the end of the data.
    #[default]
    None,
    /// Restart from the first frame forever.
    Forward,
    /// Bounce between the first and last frame forever.
    Reverse,
}

impl From<i32> for LoopMode {
    /// `0` no loop, positive forward, negative ping-pong.
    fn from(value: i32) -> Self {
        match value {
            0 => Self::None,
            v if v > 0 => Self::Forward,
            _ => Self::Reverse,
        }
    }
}

/// Current playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    /// Single forward pass.
    Forward,
    /// Forward pass, wrapping to the start.
    LoopForward,
    /// Ping-pong between both ends.
    LoopReverse {
        /// Moving towards frame 0.
        retreating: bool,
    },
}

/// Reaction to running out of frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
    /// No loop: report end of stream.
    Stop,
    /// Move the cursor to this frame and retry once.
    Retry(u64),
}

impl Playback {
    /// Initial state for a loop mode.
    ///
    /// `start_reversed` only has an effect with [`LoopMode::Reverse`] and a
    /// nonzero start index.
    pub fn new(mode: LoopMode, start_reversed: bool, start_index: u64) -> Self {
        match mode {
            LoopMode::None => Self::Forward,
            LoopMode::Forward => Self::LoopForward,
            LoopMode::Reverse => Self::LoopReverse {
                retreating: start_reversed && start_index > 0,
            },
        }
    }

    /// Whether the cursor currently moves towards frame 0.
    #[inline]
    pub fn is_retreating(&self) -> bool {
        matches!(self, Self::LoopReverse { retreating: true })
    }

    /// Transition taken when the cursor at `position` has no frame to read.
    pub fn on_exhausted(&mut self, position: u64) -> Exhaustion {
        match self {
            Self::Forward => Exhaustion::Stop,
            Self::LoopForward => Exhaustion::Retry(0),
            Self::LoopReverse { retreating } => {
                *retreating = true;
                Exhaustion::Retry(position.saturating_sub(2))
            }
        }
    }

    /// Transition taken after a frame was read, leaving the cursor at
    /// `position`. Returns the new cursor when it has to move.
    pub fn after_read(&mut self, position: u64) -> Option<u64> {
        match self {
            Self::LoopReverse { retreating: true } if position >= 2 => Some(position - 2),
            Self::LoopReverse { retreating } if *retreating => {
                // Frame 0 was just read: reflect.
                *retreating = false;
                None
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drives the state machine over `count` frames the way the reader does.
    fn simulate(mut state: Playback, frames: u64, start: u64, reads: usize) -> Vec<Option<u64>> {
        let mut position = start;
        let mut out = Vec::new();
        for _ in 0..reads {
            let mut produced = None;
            for _ in 0..2 {
                if position < frames {
                    produced = Some(position);
                    break;
                }
                match state.on_exhausted(position) {
                    Exhaustion::Stop => break,
                    Exhaustion::Retry(to) => position = to,
                }
            }
            if let Some(p) = produced {
                position = p + 1;
                if let Some(to) = state.after_read(position) {
                    position = to;
                }
            }
            out.push(produced);
        }
        out
    }

    #[test]
    fn test_loop_mode_from_int() {
        assert_eq!(LoopMode::from(0), LoopMode::None);
        assert_eq!(LoopMode::from(3), LoopMode::Forward);
        assert_eq!(LoopMode::from(-1), LoopMode::Reverse);
    }

    #[test]
    fn test_forward_stops() {
        let seq = simulate(Playback::new(LoopMode::None, false, 0), 3, 0, 4);
        assert_eq!(seq, [Some(0), Some(1), Some(2), None]);
    }

    #[test]
    fn test_loop_forward_wraps() {
        let seq = simulate(Playback::new(LoopMode::Forward, false, 0), 5, 0, 12);
        let expected: Vec<_> = (0..12).map(|i| Some(i % 5)).collect();
        assert_eq!(seq, expected);
    }

    #[test]
    fn test_loop_reverse_ping_pong() {
        let seq = simulate(Playback::new(LoopMode::Reverse, false, 0), 5, 0, 10);
        let expected: Vec<_> = [0, 1, 2, 3, 4, 3, 2, 1, 0, 1].into_iter().map(Some).collect();
        assert_eq!(seq, expected);
    }

    #[test]
    fn test_start_reversed() {
        let state = Playback::new(LoopMode::Reverse, true, 3);
        assert!(state.is_retreating());
        let seq = simulate(state, 5, 3, 9);
        let expected: Vec<_> = [3, 2, 1, 0, 1, 2, 3, 4, 3].into_iter().map(Some).collect();
        assert_eq!(seq, expected);

        // Nothing to retreat from at frame 0.
        assert!(!Playback::new(LoopMode::Reverse, true, 0).is_retreating());
    }

    #[test]
    fn test_single_frame_loops() {
        let seq = simulate(Playback::new(LoopMode::Reverse, false, 0), 1, 0, 4);
        assert_eq!(seq, [Some(0); 4]);
        let seq = simulate(Playback::new(LoopMode::Forward, false, 0), 1, 0, 3);
        assert_eq!(seq, [Some(0); 3]);
    }

    #[test]
    fn test_empty_stream_never_spins() {
        let seq = simulate(Playback::new(LoopMode::Forward, false, 0), 0, 0, 2);
        assert_eq!(seq, [None, None]);
        let seq = simulate(Playback::new(LoopMode::Reverse, false, 0), 0, 0, 2);
        assert_eq!(seq, [None, None]);
    }
}
