use std::collections::HashMap;

use serde::Serialize;

use crate::constants::*;
use crate::gaussian::GaussianCache;
use crate::hash::{sort_for_matching, Hash};

/// Tolerance on hash-key equality during the merge scan.
const HASH_DISTORTION: u32 = 1;

/// Tolerance on intra-pair time-delta equality.
const TIME_DIFF_DISTORTION: f64 = 1.5;

/// Half-width of the offset cluster around the best histogram bucket that
/// still counts toward the score.
const OFFSET_DISTORTION: i32 = 7;

/// Outcome of comparing two fingerprints. A comparison that found nothing
/// usable reports a zero score; the matcher itself never fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// Matched-hash count in the winning offset cluster, damped by the
    /// Gaussian prior on offset magnitude.
    pub score: f64,
    /// Best alignment of the second track against the first, in seconds.
    pub offset_secs: f64,
    /// Human-readable diagnostic of the histogram scan.
    pub summary: String,
}

impl MatchResult {
    fn zero() -> Self {
        Self {
            score: 0.0,
            offset_secs: 0.0,
            summary: String::new(),
        }
    }
}

/// Offset matcher over two hash lists.
///
/// A value object that is cheap to reuse: it keeps the Gaussian prior table
/// and the offset histogram between calls so batch comparisons do not
/// reallocate. One matcher per worker; it is not synchronized.
#[derive(Debug, Default)]
pub struct Matcher {
    gauss: GaussianCache,
    offsets: HashMap<i32, i32>,
}

impl Matcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare two fingerprints and report the best-supported time offset
    /// between them. Sorts both lists in place into matcher order.
    pub fn match_hashes(&mut self, song_a: &mut [Hash], song_b: &mut [Hash]) -> MatchResult {
        let (offset, cnt_in_offset, sum_offs, cnt_offs) = self.find_best_offset(song_a, song_b);

        if cnt_offs == 0 || cnt_in_offset < MIN_ALLOWED_CNT {
            return MatchResult::zero();
        }

        let offset_secs = offset as f64 / frames_per_sec();

        let shorter = song_a.len().min(song_b.len());
        let cnt_in_offset_perc = if shorter > 0 {
            100.0 * cnt_in_offset as f64 / shorter as f64
        } else {
            0.0
        };

        // Gaussian prior over plausible offsets: huge skews are suspect even
        // when well-supported by the histogram.
        let max_offset_secs = (MAX_TRACK_OFFSET_MS / 1000) as i64;
        let prior = self
            .gauss
            .make(max_offset_secs as usize, max_offset_secs as f64 / 3.0);

        let prior_idx = offset_secs.floor() as i64;
        if prior_idx <= -max_offset_secs || prior_idx >= max_offset_secs {
            return MatchResult::zero();
        }
        let score_k = prior[(max_offset_secs + prior_idx) as usize];

        let summary = format!(
            "offset: {:5} cnt_in_offset: {:5} ({:5.1}%) sum_offs: {:5} cnt_offs: {:5} len_a: {:6} len_b: {:6} score_k: {:5.3}",
            offset,
            cnt_in_offset,
            cnt_in_offset_perc,
            sum_offs,
            cnt_offs,
            song_a.len(),
            song_b.len(),
            score_k,
        );

        MatchResult {
            score: cnt_in_offset as f64 * score_k,
            offset_secs,
            summary,
        }
    }

    /// Histogram `time_a - time_b` over fuzzily-equal hash keys and pick
    /// the best-supported bucket.
    ///
    /// Returns `(offset, cnt_in_offset, sum_offs, cnt_offs)`: the winning
    /// frame offset, the matched count inside its distortion window, and
    /// the sum/count over all buckets that clear `MIN_ALLOWED_CNT`.
    fn find_best_offset(
        &mut self,
        song_a: &mut [Hash],
        song_b: &mut [Hash],
    ) -> (i32, i32, i32, i32) {
        sort_for_matching(song_a);
        sort_for_matching(song_b);

        // Scan the longer list against the shorter; undo the swap on the
        // offset sign at the end.
        let swapped = song_a.len() < song_b.len();
        let (long, short): (&[Hash], &[Hash]) = if swapped {
            (song_b, song_a)
        } else {
            (song_a, song_b)
        };

        let max_offset_frames =
            ((MAX_TRACK_OFFSET_MS as f64 / 1000.0) * frames_per_sec()).ceil() as i32;

        let hist = &mut self.offsets;
        hist.clear();

        let mut offset = 0i32;
        let mut best_cnt = 0i32;

        let mut bp_from = 0usize;
        for a in long {
            let pair_a = a.to_pair();
            if pair_a.bin1 == 0 || pair_a.bin2 == 0 {
                // barely audible low-frequency noise
                continue;
            }

            while bp_from < short.len() && a.key > short[bp_from].key + HASH_DISTORTION {
                bp_from += 1;
            }
            if bp_from >= short.len() {
                break;
            }

            for b in &short[bp_from..] {
                if b.key > a.key + HASH_DISTORTION {
                    break;
                }

                let pair_b = b.to_pair();
                if pair_b.bin1 == 0 || pair_b.bin2 == 0 {
                    continue;
                }

                let span_diff = pair_a.time_diff as f64 - pair_b.time_diff as f64;
                if span_diff.abs() >= TIME_DIFF_DISTORTION {
                    continue;
                }

                let t_diff = a.time as i32 - b.time as i32;
                if t_diff < -max_offset_frames || t_diff > max_offset_frames {
                    continue;
                }

                let n = hist.entry(t_diff).or_insert(0);
                *n += 1;
                if *n > best_cnt {
                    best_cnt = *n;
                    offset = t_diff;
                }
            }
        }

        let mut cnt_in_offset = 0i32;
        for i in (offset - OFFSET_DISTORTION)..(offset + OFFSET_DISTORTION) {
            if let Some(&n) = hist.get(&i) {
                if n >= MIN_ALLOWED_CNT {
                    cnt_in_offset += n;
                }
            }
        }

        let mut sum_offs = 0i32;
        let mut cnt_offs = 0i32;
        for &n in hist.values() {
            if n >= MIN_ALLOWED_CNT {
                sum_offs += n;
                cnt_offs += 1;
            }
        }

        if swapped {
            offset = -offset;
        }

        (offset, cnt_in_offset, sum_offs, cnt_offs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::PeakPair;

    /// A list of `n` hashes with well-separated keys, anchored at frames
    /// `t0, t0+1, ..`.
    fn fingerprint(n: u32, t0: u32) -> Vec<Hash> {
        (0..n)
            .map(|i| {
                let t = t0 + i;
                PeakPair::new(t, 10 + 2 * i, t + 5, 12 + 2 * i).to_hash()
            })
            .collect()
    }

    #[test]
    fn empty_lists_give_zero() {
        let mut m = Matcher::new();
        let result = m.match_hashes(&mut [], &mut []);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.offset_secs, 0.0);
        assert_eq!(result.summary, "");
    }

    #[test]
    fn identity_match_scores_at_zero_offset() {
        let mut m = Matcher::new();
        let mut a = fingerprint(60, 0);
        let mut b = a.clone();

        let result = m.match_hashes(&mut a, &mut b);
        assert!(result.score > 0.0);
        assert_eq!(result.offset_secs, 0.0);
        // Prior at zero offset is exactly 1, so score is the window count.
        assert_eq!(result.score, 60.0);
        assert!(result.summary.contains("offset:"));
    }

    #[test]
    fn below_support_threshold_gives_zero() {
        let mut m = Matcher::new();
        let mut a = fingerprint(4, 0);
        let mut b = a.clone();

        let result = m.match_hashes(&mut a, &mut b);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn time_shift_is_recovered_with_sign() {
        let mut m = Matcher::new();
        let mut a = fingerprint(50, 0);
        let mut b = fingerprint(50, 30);

        let forward = m.match_hashes(&mut a, &mut b);
        let expected = -30.0 / frames_per_sec();
        assert!(forward.score > 0.0);
        assert!((forward.offset_secs - expected).abs() < 1e-9);
        assert!((forward.offset_secs + 2.786).abs() < 1e-3);

        let backward = m.match_hashes(&mut b, &mut a);
        assert!((backward.offset_secs + forward.offset_secs).abs() < 1e-9);
    }

    #[test]
    fn swap_canonicalization_flips_the_offset_back() {
        let mut m = Matcher::new();
        // b is longer than a, so the scan runs with the lists exchanged.
        let mut a = fingerprint(50, 30);
        let mut b = fingerprint(80, 0);

        let result = m.match_hashes(&mut a, &mut b);
        assert!(result.score > 0.0);
        assert!((result.offset_secs - 30.0 / frames_per_sec()).abs() < 1e-9);
    }

    #[test]
    fn disjoint_keys_give_zero() {
        let mut m = Matcher::new();
        let mut a = fingerprint(50, 0);
        let mut b: Vec<Hash> = (0..50)
            .map(|i| PeakPair::new(i, 500 + 2 * i, i + 5, 502 + 2 * i).to_hash())
            .collect();

        let result = m.match_hashes(&mut a, &mut b);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.offset_secs, 0.0);
    }

    #[test]
    fn low_frequency_pairs_are_ignored() {
        let mut m = Matcher::new();
        // All pairs touch bin 0: inaudible rumble, never matched.
        let mut a: Vec<Hash> = (0..50).map(|i| PeakPair::new(i, 0, i + 5, 2).to_hash()).collect();
        let mut b = a.clone();

        let result = m.match_hashes(&mut a, &mut b);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn offsets_beyond_the_track_cap_are_dropped() {
        let mut m = Matcher::new();
        let mut a = fingerprint(50, 0);
        let mut b = fingerprint(50, 7000); // ≈ 650 s skew, past the cap

        let result = m.match_hashes(&mut a, &mut b);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.offset_secs, 0.0);
    }

    #[test]
    fn prior_gate_rejects_the_cap_edge() {
        let max_offset_frames =
            ((MAX_TRACK_OFFSET_MS as f64 / 1000.0) * frames_per_sec()).ceil() as u32;

        let mut m = Matcher::new();
        let mut a = fingerprint(50, 0);
        // Exactly at the frame cap: survives the histogram, dies on the
        // Gaussian prior range check.
        let mut b = fingerprint(50, max_offset_frames);
        let result = m.match_hashes(&mut a, &mut b);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn large_but_plausible_offset_is_damped_not_dropped() {
        let mut m = Matcher::new();
        let mut a = fingerprint(50, 0);
        let mut b = fingerprint(50, 6400); // ≈ 594 s skew

        let result = m.match_hashes(&mut a, &mut b);
        assert!(result.score > 0.0);
        // Far into the prior's tail: heavily damped relative to the count.
        assert!(result.score < 1.0);
    }

    #[test]
    fn reuse_across_matches_is_clean() {
        let mut m = Matcher::new();

        let mut a = fingerprint(50, 0);
        let mut b = fingerprint(50, 30);
        let first = m.match_hashes(&mut a, &mut b);

        let mut c = fingerprint(60, 0);
        let mut d = c.clone();
        let second = m.match_hashes(&mut c, &mut d);
        assert_eq!(second.offset_secs, 0.0);
        assert_eq!(second.score, 60.0);

        // Rerunning the first comparison reproduces it bit for bit.
        let again = m.match_hashes(&mut a, &mut b);
        assert_eq!(again, first);
    }
}
