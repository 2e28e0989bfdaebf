use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::peaks::Peak;

/// Two peaks linked by time-forward, small-frequency-delta adjacency.
/// Purely arithmetic: pairs exist only on their way into or out of a
/// packed hash key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakPair {
    pub time1: u32,
    pub bin1: u32,
    pub bin2: u32,
    pub time_diff: u32,
}

impl PeakPair {
    pub fn new(time1: u32, bin1: u32, time2: u32, bin2: u32) -> Self {
        Self {
            time1,
            bin1,
            bin2,
            time_diff: time2 - time1,
        }
    }

    pub fn time2(&self) -> u32 {
        self.time1 + self.time_diff
    }

    /// Pack into the 22-bit key: `bin1[10] | bin_diff[6] | time_diff[6]`,
    /// MSB to LSB, zero-extended to 32 bits. The masked subtraction keeps
    /// the sign bit of `bin2 - bin1` inside the 6-bit field.
    pub fn key(&self) -> u32 {
        let bin1 = self.bin1 & BIN_MASK;
        let bin_diff = self.bin2.wrapping_sub(self.bin1) & BIN_DIFF_MASK;
        let time_diff = self.time_diff & TIME_DIFF_MASK;

        (((bin1 << BIN_DIFF_BITS) | bin_diff) << TIME_DIFF_BITS) | time_diff
    }

    pub fn to_hash(&self) -> Hash {
        Hash {
            time: self.time1,
            key: self.key(),
        }
    }
}

/// One fingerprint atom: the packed pair key plus the anchor frame it was
/// observed at. The packed layout is the durable binary contract for any
/// stored fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hash {
    pub time: u32,
    pub key: u32,
}

impl Hash {
    /// Unpack the key. `bin_diff` is a 6-bit two's-complement field and is
    /// sign-extended here, so `bin2` may come out below `bin1`.
    pub fn to_pair(&self) -> PeakPair {
        let time_diff = self.key & TIME_DIFF_MASK;
        let bin_diff = (self.key >> TIME_DIFF_BITS) & BIN_DIFF_MASK;
        let bin1 = (self.key >> (TIME_DIFF_BITS + BIN_DIFF_BITS)) & BIN_MASK;

        let mut delta = bin_diff as i32;
        if delta & ((BIN_DIFF_MASK as i32 + 1) >> 1) != 0 {
            delta -= BIN_DIFF_MASK as i32 + 1;
        }

        PeakPair {
            time1: self.time,
            bin1,
            bin2: (bin1 as i32 + delta) as u32,
            time_diff,
        }
    }
}

// ── Orderings ──
//
// Three orderings live over the same data; none is canonical enough to
// earn an Ord impl, so each is an explicit comparison function handed to
// the sort that needs it (peak magnitude ordering lives with the picker).

/// Matcher ordering: key ascending, then anchor time ascending.
pub fn cmp_key_then_time(a: &Hash, b: &Hash) -> Ordering {
    a.key.cmp(&b.key).then(a.time.cmp(&b.time))
}

/// Chronological ordering: anchor time ascending, then the intra-pair
/// time-delta ascending.
pub fn cmp_time_then_span(a: &Hash, b: &Hash) -> Ordering {
    a.time
        .cmp(&b.time)
        .then(a.to_pair().time_diff.cmp(&b.to_pair().time_diff))
}

/// Cheap pre-check that amortises repeated matches over the same list.
pub fn is_sorted_for_matching(hashes: &[Hash]) -> bool {
    hashes
        .windows(2)
        .all(|w| cmp_key_then_time(&w[0], &w[1]) != Ordering::Greater)
}

/// Sort in matcher order, skipping the work when already sorted.
pub fn sort_for_matching(hashes: &mut [Hash]) {
    if !is_sorted_for_matching(hashes) {
        hashes.sort_unstable_by(cmp_key_then_time);
    }
}

// ── Pairing ──

/// Form peak pairs from a `(time, bin)`-ascending peak list.
///
/// Each anchor looks ahead `[LOOKAHEAD_TIME_DIFF_MIN, LOOKAHEAD_TIME_DIFF_MAX)`
/// frames and pairs with peaks within `LOOKAHEAD_BIN_DIFF_MAX` bins, up to
/// `MAX_PAIRS_PER_PEAK` pairs per anchor.
pub fn peaks_to_pairs(peaks: &[Peak]) -> Vec<PeakPair> {
    if peaks.is_empty() {
        return Vec::new();
    }

    let time_cnt = peaks[peaks.len() - 1].time + 1;
    let mut peaks_at: Vec<Vec<u32>> = vec![Vec::new(); time_cnt as usize];
    for peak in peaks {
        peaks_at[peak.time as usize].push(peak.bin);
    }

    let mut pairs = Vec::new();

    for time1 in 0..time_cnt {
        'anchors: for &bin1 in &peaks_at[time1 as usize] {
            let mut budget = 0usize;
            let last_time2 = time_cnt.min(time1 + LOOKAHEAD_TIME_DIFF_MAX);

            for time2 in (time1 + LOOKAHEAD_TIME_DIFF_MIN)..last_time2 {
                for &bin2 in &peaks_at[time2 as usize] {
                    if bin1.abs_diff(bin2) < LOOKAHEAD_BIN_DIFF_MAX {
                        pairs.push(PeakPair::new(time1, bin1, time2, bin2));

                        budget += 1;
                        if budget >= MAX_PAIRS_PER_PEAK {
                            continue 'anchors;
                        }
                    }
                }
            }
        }
    }

    pairs
}

pub fn pairs_to_hashes(pairs: &[PeakPair]) -> Vec<Hash> {
    pairs.iter().map(PeakPair::to_hash).collect()
}

/// Fingerprint a peak list.
pub fn find_hashes(peaks: &[Peak]) -> Vec<Hash> {
    pairs_to_hashes(&peaks_to_pairs(peaks))
}
