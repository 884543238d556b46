//! Zoid records and the arena that owns them.
//!
//! All tree links are arena indices, never pointers: the table grows
//! monotonically during a tuning run and nothing is destroyed, so an index
//! handed out once stays valid for the life of the run. Slot 0 is a sentinel
//! root holder so every real zoid has a parent to link into.

use super::decision::Decision;
use super::projection::ProjectionMap;

/// Arena index of a zoid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ZoidIdx(pub u32);

impl ZoidIdx {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The persistent record of one distinct zoid shape met during tuning.
#[derive(Clone, Debug)]
pub struct Zoid<const N: usize> {
    /// Time extent this record was built for. Fixed at creation.
    pub height: i64,
    pub decision: Decision<N>,
    /// Best (chosen) estimated cost for this zoid including descendants,
    /// in seconds.
    pub time: f64,
    /// Maximum base-case loop time observed anywhere in this subtree.
    pub max_loop_time: f64,
    /// Child zoids in the order the winning strategy generates them.
    pub children: Vec<ZoidIdx>,
}

impl<const N: usize> Zoid<N> {
    fn new(height: i64, boundary: bool) -> Self {
        Self {
            height,
            decision: Decision::leaf(boundary),
            time: 0.0,
            max_loop_time: 0.0,
            children: Vec::new(),
        }
    }
}

/// Reduced zoid for the replay pass: decision and children only, no timing
/// instrumentation.
#[derive(Clone, Debug)]
pub struct SimpleZoid<const N: usize> {
    pub height: i64,
    pub decision: Decision<N>,
    pub children: Vec<ZoidIdx>,
}

/// Growable, index-addressed store of zoid records plus the projection cache
/// mapping shape fingerprints to them.
pub struct ZoidArena<const N: usize> {
    zoids: Vec<Zoid<N>>,
    /// Interior zoids: keyed by (fingerprint, height) only — position-free.
    interior: ProjectionMap,
    /// Boundary-touching zoids: additionally keyed by centroid, since position
    /// matters once the boundary kernel is involved.
    boundary: ProjectionMap,
}

impl<const N: usize> ZoidArena<N> {
    pub fn new() -> Self {
        // Slot 0 is the sentinel root holder, never tuned or replayed itself.
        Self {
            zoids: vec![Zoid::new(0, false)],
            interior: ProjectionMap::with_capacity(256),
            boundary: ProjectionMap::with_capacity(256),
        }
    }

    pub const SENTINEL: ZoidIdx = ZoidIdx(0);

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.zoids.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        // The sentinel always exists; "empty" means no real zoids.
        self.zoids.len() <= 1
    }

    #[inline(always)]
    pub fn zoid(&self, idx: ZoidIdx) -> &Zoid<N> {
        &self.zoids[idx.index()]
    }

    #[inline(always)]
    pub fn zoid_mut(&mut self, idx: ZoidIdx) -> &mut Zoid<N> {
        &mut self.zoids[idx.index()]
    }

    /// Look up an interior zoid without creating it.
    pub fn find_interior(&self, key: u128, height: i64) -> Option<ZoidIdx> {
        self.interior.get(key, height, 0)
    }

    /// Look up a boundary zoid without creating it.
    pub fn find_boundary(&self, key: u128, height: i64, centroid: u64) -> Option<ZoidIdx> {
        self.boundary.get(key, height, centroid)
    }

    /// Look up the interior zoid with this fingerprint and height, creating it
    /// if absent. Returns the index and whether it already existed.
    pub fn lookup_or_create_interior(&mut self, key: u128, height: i64) -> (ZoidIdx, bool) {
        if let Some(idx) = self.interior.get(key, height, 0) {
            return (idx, true);
        }
        let idx = self.push_zoid(height, false);
        self.interior.insert(key, height, 0, idx);
        debug_assert_eq!(self.interior.len() + self.boundary.len(), self.zoids.len() - 1);
        (idx, false)
    }

    /// Boundary-zoid variant: the centroid joins the cache key.
    pub fn lookup_or_create_boundary(
        &mut self,
        key: u128,
        height: i64,
        centroid: u64,
    ) -> (ZoidIdx, bool) {
        if let Some(idx) = self.boundary.get(key, height, centroid) {
            return (idx, true);
        }
        let idx = self.push_zoid(height, true);
        self.boundary.insert(key, height, centroid, idx);
        debug_assert_eq!(self.interior.len() + self.boundary.len(), self.zoids.len() - 1);
        (idx, false)
    }

    fn push_zoid(&mut self, height: i64, boundary: bool) -> ZoidIdx {
        let idx = ZoidIdx(u32::try_from(self.zoids.len()).expect("zoid table overflows u32"));
        self.zoids.push(Zoid::new(height, boundary));
        idx
    }

    /// Compile the reduced table the replay engine walks. Indices are shared
    /// with the full table.
    pub fn compile(&self) -> Vec<SimpleZoid<N>> {
        self.zoids
            .iter()
            .map(|z| SimpleZoid {
                height: z.height,
                decision: z.decision,
                children: z.children.clone(),
            })
            .collect()
    }

    /// Iterate all real (non-sentinel) zoids.
    pub fn iter(&self) -> impl Iterator<Item = (ZoidIdx, &Zoid<N>)> {
        self.zoids
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, z)| (ZoidIdx(i as u32), z))
    }
}

impl<const N: usize> Default for ZoidArena<N> {
    fn default() -> Self {
        Self::new()
    }
}
