use super::{ChannelLayout, Speaker};

/// Policy that picks which supported layout best serves a requested one.
///
/// The engine owns this decision; the output only supplies candidates.
pub trait LayoutSelector: Send + Sync {
    fn select(&self, candidates: &[ChannelLayout], requested: &ChannelLayout)
        -> Option<ChannelLayout>;
}

/// Default selection: exact speaker set, then mono-as-stereo, then the
/// candidate that loses the fewest requested speakers and adds the fewest
/// extra ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosestLayout;

impl LayoutSelector for ClosestLayout {
    fn select(
        &self,
        candidates: &[ChannelLayout],
        requested: &ChannelLayout,
    ) -> Option<ChannelLayout> {
        let valid: Vec<&ChannelLayout> = candidates.iter().filter(|c| c.is_valid()).collect();

        if let Some(exact) = valid.iter().find(|c| c.same_speakers(requested)) {
            return Some((*exact).clone());
        }

        if *requested == ChannelLayout::mono() {
            let stereo = ChannelLayout::stereo();
            if let Some(found) = valid.iter().find(|c| c.same_speakers(&stereo)) {
                return Some((*found).clone());
            }
        }

        // min_by_key keeps the first of equal keys, so table order breaks ties
        valid
            .into_iter()
            .min_by_key(|candidate| score(candidate, requested))
            .cloned()
    }
}

fn score(candidate: &ChannelLayout, requested: &ChannelLayout) -> (usize, usize) {
    let missing = count_absent(requested.speakers(), candidate);
    let extra = count_absent(candidate.speakers(), requested);
    (missing, extra)
}

fn count_absent(speakers: &[Speaker], other: &ChannelLayout) -> usize {
    speakers.iter().filter(|s| !other.contains(**s)).count()
}
