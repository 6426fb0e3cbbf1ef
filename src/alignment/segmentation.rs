use crate::types::{AudioSignal, Segment};

const POWER_FLOOR: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitParams {
    /// Frames quieter than this many dB below the loudest frame are silence.
    pub top_db: f32,
    pub frame_length: usize,
    pub hop_length: usize,
    /// Active runs shorter than this many frames are dropped.
    pub min_active_frames: usize,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            top_db: 20.0,
            frame_length: 2048,
            hop_length: 512,
            min_active_frames: 1,
        }
    }
}

/// Splits a signal into speech-active segments.
///
/// Energy is measured on centred frames of `frame_length` samples every
/// `hop_length` samples; a frame is active when its power is within `top_db` of
/// the loudest frame. Active frame runs map back to `[first * hop, (last + 1) * hop)`
/// clamped to the signal. Resolution is one hop: a burst is only kept if it lifts
/// at least one frame above the threshold, and runs shorter than
/// `min_active_frames` are dropped.
///
/// Empty and digitally silent signals yield no segments.
pub fn split_active_segments(signal: &AudioSignal, params: &SplitParams) -> Vec<Segment> {
    let Some(frame_power) =
        compute_frame_power(&signal.samples, params.frame_length, params.hop_length)
    else {
        return Vec::new();
    };

    let peak = frame_power.iter().copied().fold(0.0f64, f64::max);
    if peak <= POWER_FLOOR {
        tracing::debug!(
            samples = signal.samples.len(),
            "segmentation: signal is silent, no active segments"
        );
        return Vec::new();
    }

    let ref_db = power_to_db(peak);
    let threshold_db = -(params.top_db as f64);
    let active: Vec<bool> = frame_power
        .iter()
        .map(|&p| power_to_db(p) - ref_db > threshold_db)
        .collect();

    let hop = params.hop_length.max(1);
    let len = signal.samples.len();
    let segments: Vec<Segment> = active_runs(&active, params.min_active_frames.max(1))
        .into_iter()
        .filter_map(|(first, last)| {
            let start = (first * hop).min(len);
            let end = ((last + 1) * hop).min(len);
            (start < end).then_some(Segment {
                start,
                end,
                sample_rate_hz: signal.sample_rate_hz,
            })
        })
        .collect();

    tracing::debug!(
        frames = active.len(),
        segments = segments.len(),
        top_db = params.top_db,
        "segmentation: split signal into active segments"
    );
    segments
}

/// The whole signal as one segment, or nothing when it is empty.
pub fn whole_signal_segment(signal: &AudioSignal) -> Vec<Segment> {
    if signal.is_empty() {
        return Vec::new();
    }
    vec![Segment {
        start: 0,
        end: signal.len(),
        sample_rate_hz: signal.sample_rate_hz,
    }]
}

fn power_to_db(power: f64) -> f64 {
    10.0 * power.max(POWER_FLOOR).log10()
}

/// Inclusive `(first, last)` frame indices of each active run.
fn active_runs(active: &[bool], min_frames: usize) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut run_start: Option<usize> = None;
    for (frame_idx, &is_active) in active.iter().enumerate() {
        match (is_active, run_start) {
            (true, None) => run_start = Some(frame_idx),
            (false, Some(start)) => {
                if frame_idx - start >= min_frames {
                    runs.push((start, frame_idx - 1));
                }
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        if active.len() - start >= min_frames {
            runs.push((start, active.len() - 1));
        }
    }
    runs
}

/// Mean square of each centred frame, zero-padded by `frame_length / 2` per side.
fn compute_frame_power(samples: &[f32], frame_length: usize, hop_length: usize) -> Option<Vec<f64>> {
    if samples.is_empty() || frame_length == 0 || hop_length == 0 {
        return None;
    }
    let half = frame_length / 2;
    let n_frames = 1 + samples.len() / hop_length;

    let mut frame_power = Vec::with_capacity(n_frames);
    for t in 0..n_frames {
        let center = t * hop_length;
        let lo = center.saturating_sub(half);
        let hi = (center + frame_length - half).min(samples.len());
        let sum_sq = if lo < hi {
            samples[lo..hi]
                .iter()
                .map(|&x| (x as f64) * (x as f64))
                .sum::<f64>()
        } else {
            0.0
        };
        frame_power.push(sum_sq / frame_length as f64);
    }
    Some(frame_power)
}
