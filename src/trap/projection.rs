//! `ProjectionMap` — an open-addressing hashmap specialized for
//! `(fingerprint, height, centroid) → ZoidIdx` lookups.
//!
//! Design goals:
//! - Flat, cache-friendly layout with compact control metadata.
//! - Robin Hood probing; the table is append-only during tuning, so there is
//!   no deletion path at all.
//! - Fingerprint check in the control word to skip full key comparisons.
//! - Probe distance encoded in the control word (no per-probe hash reload).

use super::zoid::ZoidIdx;

// ── Hash function ───────────────────────────────────────────────────────

/// Distinct Fibonacci-derived constants so each key component contributes
/// independent entropy. Zoid fingerprints are highly structured (packed
/// width fields), which a single-constant sequential hash mixes poorly.
const MK_LO: u64 = 0x517c_c1b7_2722_0a95;
const MK_HI: u64 = 0x6c62_272e_07bb_0142;
const MH: u64 = 0x9e37_79b9_7f4a_7c15;
const MC: u64 = 0x2545_f491_4f6c_dd1d;

#[inline(always)]
fn projection_hash(key: u128, height: i64, centroid: u64) -> u64 {
    let lo = key as u64;
    let hi = (key >> 64) as u64;
    lo.wrapping_mul(MK_LO)
        ^ hi.wrapping_mul(MK_HI).rotate_right(31)
        ^ (height as u64).wrapping_mul(MH).rotate_right(17)
        ^ centroid.wrapping_mul(MC).rotate_right(47)
}

// ── Slot layout ─────────────────────────────────────────────────────────

const EMPTY: u32 = 0;
const OCCUPIED_BIT: u32 = 0x8000_0000;
const DIST_SHIFT: u32 = 12;
const DIST_MASK: u32 = 0x7fff_f000;
const FP_MASK: u32 = 0x0000_0fff;
const MATCH_MASK: u32 = OCCUPIED_BIT | FP_MASK;
const MAX_DIST: usize = (DIST_MASK >> DIST_SHIFT) as usize;

/// A single slot in the hash table.
///
/// Control word layout:
/// - bit 31: occupied flag
/// - bits 12..30: probe distance (Robin Hood DIB)
/// - bits 0..11: key fingerprint
#[derive(Clone, Copy)]
#[repr(C)]
struct Slot {
    key: u128,
    height: i64,
    centroid: u64,
    value: u32,
    /// High bit = occupied, mid bits = probe distance, low bits = fingerprint.
    /// `0` means empty.
    ctrl: u32,
}

impl Slot {
    const EMPTY: Self = Self {
        key: 0,
        height: 0,
        centroid: 0,
        value: 0,
        ctrl: EMPTY,
    };

    #[inline(always)]
    fn is_empty(self) -> bool {
        self.ctrl == EMPTY
    }

    #[inline(always)]
    fn distance(self) -> usize {
        ((self.ctrl & DIST_MASK) >> DIST_SHIFT) as usize
    }

    #[inline(always)]
    fn set_distance(&mut self, distance: usize) {
        assert!(
            distance <= MAX_DIST,
            "ProjectionMap probe distance overflow (distance={distance}, max={MAX_DIST})"
        );
        self.ctrl = (self.ctrl & !DIST_MASK) | ((distance as u32) << DIST_SHIFT);
    }

    #[inline(always)]
    fn match_ctrl(self) -> u32 {
        self.ctrl & MATCH_MASK
    }

    #[inline(always)]
    fn matches(self, key: u128, height: i64, centroid: u64) -> bool {
        self.key == key && self.height == height && self.centroid == centroid
    }
}

#[inline(always)]
fn match_ctrl_of(hash: u64) -> u32 {
    OCCUPIED_BIT | ((hash >> 52) as u32 & FP_MASK)
}

// ── ProjectionMap ───────────────────────────────────────────────────────

/// Maximum load factor numerator / denominator: 1/2 = 50%.
const LOAD_NUM: usize = 1;
const LOAD_DEN: usize = 2;

/// Open-addressed hashmap from zoid shape keys to arena indices.
pub struct ProjectionMap {
    slots: Vec<Slot>,
    len: usize,
    /// `capacity - 1`. Capacity is always a power of two.
    mask: usize,
}

impl ProjectionMap {
    /// Create an empty map with room for at least `cap` entries before growing.
    pub fn with_capacity(cap: usize) -> Self {
        let min_slots = cap
            .saturating_mul(LOAD_DEN)
            .div_ceil(LOAD_NUM)
            .next_power_of_two()
            .max(16);
        Self {
            slots: vec![Slot::EMPTY; min_slots],
            len: 0,
            mask: min_slots - 1,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // ── Lookup ──────────────────────────────────────────────────────────

    /// Look up a zoid index by shape key.
    ///
    /// Robin Hood displacement gives early exit on miss: if a slot's
    /// displacement is less than what our key would have at this position,
    /// the key cannot exist further along the chain.
    #[inline]
    pub fn get(&self, key: u128, height: i64, centroid: u64) -> Option<ZoidIdx> {
        let hash = projection_hash(key, height, centroid);
        let target_ctrl = match_ctrl_of(hash);
        let mask = self.mask;
        let mut pos = hash as usize & mask;
        let mut our_dist = 0usize;

        loop {
            let slot = self.slots[pos];
            if slot.is_empty() {
                return None;
            }
            if our_dist > slot.distance() {
                return None;
            }
            if slot.match_ctrl() == target_ctrl && slot.matches(key, height, centroid) {
                return Some(ZoidIdx(slot.value));
            }
            pos = (pos + 1) & mask;
            our_dist += 1;
        }
    }

    // ── Insert ──────────────────────────────────────────────────────────

    /// Insert a new mapping. The key must not already be present; the arena
    /// only inserts after a failed lookup.
    pub fn insert(&mut self, key: u128, height: i64, centroid: u64, value: ZoidIdx) {
        debug_assert!(
            self.get(key, height, centroid).is_none(),
            "duplicate projection insert"
        );
        if (self.len + 1) * LOAD_DEN > self.slots.len() * LOAD_NUM {
            self.grow();
        }
        let hash = projection_hash(key, height, centroid);
        let mut incoming = Slot {
            key,
            height,
            centroid,
            value: value.0,
            ctrl: match_ctrl_of(hash),
        };
        let mask = self.mask;
        let mut pos = hash as usize & mask;
        let mut dist = 0usize;

        loop {
            let slot = &mut self.slots[pos];
            if slot.is_empty() {
                incoming.set_distance(dist);
                *slot = incoming;
                self.len += 1;
                return;
            }
            // Robin Hood: displace the richer resident and keep probing with it.
            let their_dist = slot.distance();
            if their_dist < dist {
                incoming.set_distance(dist);
                let evicted = std::mem::replace(slot, incoming);
                incoming = evicted;
                dist = their_dist;
            }
            pos = (pos + 1) & mask;
            dist += 1;
        }
    }

    fn grow(&mut self) {
        let new_cap = self.slots.len() * 2;
        let old = std::mem::replace(&mut self.slots, vec![Slot::EMPTY; new_cap]);
        self.mask = new_cap - 1;
        self.len = 0;
        for slot in old {
            if !slot.is_empty() {
                self.insert(
                    slot.key,
                    slot.height,
                    slot.centroid,
                    ZoidIdx(slot.value),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trip() {
        let mut map = ProjectionMap::with_capacity(4);
        map.insert(0xABCD, 16, 0, ZoidIdx(7));
        assert_eq!(map.get(0xABCD, 16, 0), Some(ZoidIdx(7)));
        assert_eq!(map.get(0xABCD, 8, 0), None);
        assert_eq!(map.get(0xABCD, 16, 1), None);
        assert_eq!(map.get(0xABCE, 16, 0), None);
    }

    #[test]
    fn survives_growth_past_initial_capacity() {
        let mut map = ProjectionMap::with_capacity(4);
        for i in 0..4096u32 {
            map.insert((i as u128) << 32 | i as u128, i as i64 & 31, 0, ZoidIdx(i));
        }
        assert_eq!(map.len(), 4096);
        for i in 0..4096u32 {
            assert_eq!(
                map.get((i as u128) << 32 | i as u128, i as i64 & 31, 0),
                Some(ZoidIdx(i)),
                "entry {i} lost after growth"
            );
        }
    }

    #[test]
    fn structured_keys_do_not_collide() {
        // Packed width fields differing in one low bit per dimension — the
        // adversarial pattern for a weak mix.
        let mut map = ProjectionMap::with_capacity(16);
        let mut n = 0u32;
        for lb in 0..32u128 {
            for tb in 0..32u128 {
                map.insert(lb << 16 | tb, 8, 0, ZoidIdx(n));
                n += 1;
            }
        }
        let mut n = 0u32;
        for lb in 0..32u128 {
            for tb in 0..32u128 {
                assert_eq!(map.get(lb << 16 | tb, 8, 0), Some(ZoidIdx(n)));
                n += 1;
            }
        }
    }
}
