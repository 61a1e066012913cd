// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.

use crate::config::ResolverConfig;
use log::trace;
use paired_info::PairObservation;

/// Slack applied to the insert size on both sides of the distance filter.
const INSERT_SIZE_MARGIN: f64 = 1.3;

/// Largest shift a distance correction may apply before the observation is
/// rejected.
const MAX_DISTANCE_CORRECTION: i64 = 10;

/// Rejects paired observations whose distance cannot come from one read pair.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DistanceFilter {
    insert_size: f64,
    read_length: f64,
}

impl DistanceFilter {
    pub(crate) fn new(cfg: &ResolverConfig) -> Self {
        DistanceFilter {
            insert_size: cfg.insert_size,
            read_length: cfg.read_length,
        }
    }

    /// Return the corrected observation if it is usable.  `first_len` is the
    /// length of the working edge, `second_len` that of the paired edge in the
    /// original graph.
    pub(crate) fn correct(
        &self,
        obs: &PairObservation,
        first_len: usize,
        second_len: usize,
    ) -> Option<PairObservation> {
        if (obs.distance - first_len as i64) as f64 > INSERT_SIZE_MARGIN * self.insert_size {
            trace!("{} -> {} at {}: too far", obs.first, obs.second, obs.distance);
            return None;
        }

        // Distances are taken as estimated; the walk-based correction is not applied.
        let corrected = *obs;
        if (corrected.distance - obs.distance).abs() > MAX_DISTANCE_CORRECTION {
            return None;
        }
        if ((corrected.distance + second_len as i64) as f64)
            < (self.insert_size - self.read_length) / INSERT_SIZE_MARGIN
        {
            trace!("{} -> {} at {}: too close", obs.first, obs.second, obs.distance);
            return None;
        }
        Some(corrected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use condensed_graph::EdgeId;

    #[test]
    fn test_filter_bounds() {
        let filter = DistanceFilter::new(&ResolverConfig::new(300.0, 100.0));
        let obs = |d| PairObservation::new(EdgeId(0), EdgeId(1), d, 1.0, 0.0);

        // 1.3 * 300 = 390 past the end of a 200 base edge.
        assert!(filter.correct(&obs(590), 200, 200).is_some());
        assert!(filter.correct(&obs(591), 200, 200).is_none());

        // (300 - 100) / 1.3 ~ 153.8, compared with distance + paired length.
        assert!(filter.correct(&obs(0), 200, 154).is_some());
        assert!(filter.correct(&obs(0), 200, 153).is_none());
        assert!(filter.correct(&obs(-50), 200, 200).is_none());
    }
}
