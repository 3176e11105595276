//! Quality selection
//!
//! The scheduler asks a `QualitySelector` which rung of the ladder to use
//! at every segment boundary, never mid-segment. Selectors see the lane
//! snapshot (reported buffer, current quality) and the track, and must
//! pick a variant whose segment at `ts` is ready.

use rand::seq::SliceRandom;

use crate::catalog::{Track, TrackFormat};
use crate::session::LaneState;

/// Strategy hook for per-segment quality decisions
///
/// Implementations must be pure with respect to the lane snapshot and may
/// only return a variant that is ready at `ts`; returning `None` defers
/// the segment to a later tick.
pub trait QualitySelector: Send {
    fn select(&self, lane: &LaneState, track: &Track, ts: u64) -> Option<TrackFormat>;
}

/// Uniformly random choice among the ready variants
///
/// Placeholder policy; production deployments inject a buffer-aware
/// selector through the same trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSelector;

impl QualitySelector for RandomSelector {
    fn select(&self, _lane: &LaneState, track: &Track, ts: u64) -> Option<TrackFormat> {
        track.ready_formats(ts).choose(&mut rand::thread_rng()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::{MediaBlob, MediaKind};

    use super::*;

    fn track(formats: &[&str]) -> Track {
        Track::new(
            MediaKind::Audio,
            96_000,
            "mp4a.40.2".into(),
            formats.iter().map(|f| TrackFormat::from(*f)).collect(),
        )
    }

    #[test]
    fn test_selects_only_ready_variants() {
        let track = track(&["128k", "64k"]);
        let lane = LaneState::default();
        let selector = RandomSelector;

        assert!(selector.select(&lane, &track, 0).is_none());

        let ready = TrackFormat::from("64k");
        track
            .store()
            .insert_segment(&ready, 0, MediaBlob::from_bytes(vec![0; 4]));

        for _ in 0..16 {
            assert_eq!(selector.select(&lane, &track, 0), Some(ready.clone()));
        }
    }

    #[test]
    fn test_draws_from_the_whole_ladder() {
        let track = track(&["128k", "64k"]);
        for format in ["128k", "64k"] {
            track.store().insert_segment(
                &TrackFormat::from(format),
                0,
                MediaBlob::from_bytes(vec![0; 4]),
            );
        }

        let lane = LaneState::default();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            if let Some(format) = RandomSelector.select(&lane, &track, 0) {
                seen.insert(format.to_string());
            }
        }
        assert_eq!(seen.len(), 2);
    }
}
