//! Additive win/loss aggregates
//!
//! Every field only ever grows, and merging two counters is component-wise
//! addition — associative and commutative, so deltas can be applied in any
//! order and pre-merged locally before hitting the store.

use crate::match_core::outcome::{MatchOutcome, MatchResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Duration histogram bucket width in seconds.
pub const DURATION_BUCKET_SECS: u32 = 30;

/// Win/loss/draw tally with the total number of counted matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTally {
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
    pub potential_total: u64,
}

impl ResultTally {
    /// Increment only the bucket matching `result`.
    pub fn bump(&mut self, result: MatchResult) {
        match result {
            MatchResult::Win => self.wins += 1,
            MatchResult::Loss => self.losses += 1,
            MatchResult::Draw => self.draws += 1,
        }
    }

    /// Count one match: bucket plus potential total.
    pub fn record(&mut self, result: MatchResult) {
        self.bump(result);
        self.potential_total += 1;
    }

    pub fn add(&mut self, other: &ResultTally) {
        self.wins += other.wins;
        self.losses += other.losses;
        self.draws += other.draws;
        self.potential_total += other.potential_total;
    }

    pub fn is_empty(&self) -> bool {
        *self == ResultTally::default()
    }
}

/// Occurrence counts of integer entries (duration buckets, elimination
/// ranks). Keys stay sorted for deterministic serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrequencyCounter {
    frequencies: BTreeMap<u32, u64>,
}

impl FrequencyCounter {
    pub fn add_entry(&mut self, entry: u32) {
        *self.frequencies.entry(entry).or_insert(0) += 1;
    }

    pub fn add_count(&mut self, entry: u32, count: u64) {
        *self.frequencies.entry(entry).or_insert(0) += count;
    }

    pub fn merge(&mut self, other: &FrequencyCounter) {
        for (&entry, &count) in &other.frequencies {
            self.add_count(entry, count);
        }
    }

    pub fn get(&self, entry: u32) -> u64 {
        self.frequencies.get(&entry).copied().unwrap_or(0)
    }

    pub fn entries(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.frequencies.iter().map(|(&entry, &count)| (entry, count))
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Frequency-weighted mean of the entries, 0 when empty.
    pub fn average_entry(&self) -> f64 {
        let (total, count) = self
            .frequencies
            .iter()
            .fold((0.0, 0u64), |(total, count), (&entry, &freq)| {
                (total + entry as f64 * freq as f64, count + freq)
            });
        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }
}

/// The fixed-shape aggregate stored on every trie node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultCounter {
    pub result: ResultTally,
    pub star: ResultTally,
    pub trophy_change: i64,
    pub durations: FrequencyCounter,
}

impl ResultCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one outcome in. The star potential only advances when the
    /// match designated a star player at all, so star win rates stay
    /// meaningful for modes without the mechanic.
    pub fn apply(&mut self, outcome: &MatchOutcome) {
        self.result.record(outcome.result);

        if outcome.star_player_exists {
            self.star.potential_total += 1;
            if outcome.is_star_player {
                self.star.bump(outcome.result);
            }
        }

        self.trophy_change += outcome.trophy_change;

        if let Some(secs) = outcome.duration_secs {
            self.durations.add_entry(secs / DURATION_BUCKET_SECS);
        }
    }

    pub fn merge(&mut self, other: &ResultCounter) {
        self.result.add(&other.result);
        self.star.add(&other.star);
        self.trophy_change += other.trophy_change;
        self.durations.merge(&other.durations);
    }

    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
            && self.star.is_empty()
            && self.trophy_change == 0
            && self.durations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_core::outcome::{MatchOutcome, MatchType};

    fn outcome(result: MatchResult, star: bool, star_exists: bool) -> MatchOutcome {
        MatchOutcome::new(
            Some("Backyard Bowl".to_string()),
            "brawlBall".to_string(),
            "Colt".to_string(),
            result,
            star,
            star_exists,
            Some(95),
            4,
            MatchType::Regular,
        )
    }

    #[test]
    fn test_potential_total_equals_sum_of_buckets() {
        let mut counter = ResultCounter::new();
        counter.apply(&outcome(MatchResult::Win, true, true));
        counter.apply(&outcome(MatchResult::Loss, false, true));
        counter.apply(&outcome(MatchResult::Draw, false, false));

        let r = counter.result;
        assert_eq!(r.wins + r.losses + r.draws, r.potential_total);
        assert_eq!(r.potential_total, 3);
    }

    #[test]
    fn test_star_potential_requires_star_player_exists() {
        let mut counter = ResultCounter::new();
        counter.apply(&outcome(MatchResult::Win, false, false));
        assert_eq!(counter.star.potential_total, 0);

        counter.apply(&outcome(MatchResult::Win, false, true));
        assert_eq!(counter.star.potential_total, 1);
        assert_eq!(counter.star.wins, 0);

        counter.apply(&outcome(MatchResult::Win, true, true));
        assert_eq!(counter.star.potential_total, 2);
        assert_eq!(counter.star.wins, 1);
    }

    #[test]
    fn test_duration_bucketing() {
        let mut counter = ResultCounter::new();
        let mut o = outcome(MatchResult::Win, false, true);
        o.duration_secs = Some(95);
        counter.apply(&o);

        // floor(95 / 30) = 3
        assert_eq!(counter.durations.get(3), 1);

        o.duration_secs = Some(29);
        counter.apply(&o);
        assert_eq!(counter.durations.get(0), 1);

        o.duration_secs = None;
        counter.apply(&o);
        assert_eq!(counter.durations.entries().map(|(_, c)| c).sum::<u64>(), 2);
    }

    #[test]
    fn test_apply_order_is_irrelevant() {
        let a = outcome(MatchResult::Win, true, true);
        let b = outcome(MatchResult::Loss, false, true);
        let c = outcome(MatchResult::Draw, false, false);

        let mut forward = ResultCounter::new();
        for o in [&a, &b, &c] {
            forward.apply(o);
        }
        let mut backward = ResultCounter::new();
        for o in [&c, &b, &a] {
            backward.apply(o);
        }

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_merge_is_commutative_and_associative() {
        let mut x = ResultCounter::new();
        x.apply(&outcome(MatchResult::Win, true, true));
        let mut y = ResultCounter::new();
        y.apply(&outcome(MatchResult::Loss, false, true));
        y.apply(&outcome(MatchResult::Draw, false, false));
        let mut z = ResultCounter::new();
        z.apply(&outcome(MatchResult::Win, false, false));

        let mut xy = x.clone();
        xy.merge(&y);
        let mut yx = y.clone();
        yx.merge(&x);
        assert_eq!(xy, yx);

        let mut xy_z = xy.clone();
        xy_z.merge(&z);
        let mut yz = y.clone();
        yz.merge(&z);
        let mut x_yz = x.clone();
        x_yz.merge(&yz);
        assert_eq!(xy_z, x_yz);
    }

    #[test]
    fn test_trophy_change_accumulates() {
        let mut counter = ResultCounter::new();
        let mut o = outcome(MatchResult::Win, false, true);
        o.trophy_change = 8;
        counter.apply(&o);
        o.trophy_change = -3;
        counter.apply(&o);
        assert_eq!(counter.trophy_change, 5);
    }

    #[test]
    fn test_frequency_counter_average() {
        let mut ranks = FrequencyCounter::default();
        ranks.add_entry(1);
        ranks.add_entry(3);
        ranks.add_entry(3);
        assert!((ranks.average_entry() - 7.0 / 3.0).abs() < 1e-9);
        assert_eq!(FrequencyCounter::default().average_entry(), 0.0);
    }
}
