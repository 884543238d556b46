//! Sample heat-diffusion kernels over periodic grids, double-buffered in
//! time. Used by the demo driver, the benchmarks, and the parity tests.
//!
//! The row (or plane) holding the state at time `t` is `t & 1`; each step
//! reads it and writes the other one.
//!
//! Safety of the `Sync` impls: kernel calls access cells only through
//! per-element raw pointers (`UnsafeCell::raw_get`) — no `&`/`&mut` to the
//! buffer is ever formed during a call, so concurrent calls alias nothing.
//! The decomposition guarantees concurrent calls touch disjoint cells of
//! the same buffer half, with a join barrier between dependent rounds.

use std::cell::UnsafeCell;

use rand::Rng;
use rand::SeedableRng;

use crate::trap::{GridInfo, StencilKernel};

fn cell_buf(len: usize) -> Box<[UnsafeCell<f64>]> {
    (0..len).map(|_| UnsafeCell::new(0.0)).collect()
}

/// Split a plain buffer into the read half for step `t` and the write half.
/// Only the single-threaded naive steppers use this.
#[inline(always)]
fn halves(cells: &mut [f64], half: usize, t: i64) -> (&[f64], &mut [f64]) {
    let (a, b) = cells.split_at_mut(half);
    if t & 1 == 0 {
        (a, b)
    } else {
        (b, a)
    }
}

// ── 1-D ─────────────────────────────────────────────────────────────────

/// 1-D periodic heat diffusion, three-point stencil.
pub struct Heat1d {
    width: i64,
    cells: Box<[UnsafeCell<f64>]>,
}

unsafe impl Sync for Heat1d {}

impl Heat1d {
    pub fn new(width: i64) -> Self {
        assert!(width > 0);
        Self {
            width,
            cells: cell_buf(2 * width as usize),
        }
    }

    /// Fill the `t = 0` row with seeded random data and zero the other row.
    pub fn seed(&mut self, seed: u64) {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let w = self.width as usize;
        for x in 0..w {
            *self.cells[x].get_mut() = rng.random::<f64>();
            *self.cells[w + x].get_mut() = 0.0;
        }
    }

    /// Snapshot of the state at time `t`.
    pub fn row(&mut self, t: i64) -> Vec<f64> {
        let w = self.width as usize;
        let base = (t & 1) as usize * w;
        self.cells[base..base + w]
            .iter_mut()
            .map(|c| *c.get_mut())
            .collect()
    }

    /// Raw pointer to cell `idx`. No reference to the buffer is formed.
    #[inline(always)]
    fn cell(&self, idx: usize) -> *mut f64 {
        debug_assert!(idx < self.cells.len());
        UnsafeCell::raw_get(&self.cells[idx])
    }

    /// # Safety
    /// `idx` must be in bounds and no concurrent write may target it.
    #[inline(always)]
    unsafe fn read(&self, idx: usize) -> f64 {
        unsafe { *self.cell(idx) }
    }

    /// # Safety
    /// `idx` must be in bounds and no concurrent access may target it.
    #[inline(always)]
    unsafe fn write(&self, idx: usize, v: f64) {
        unsafe { *self.cell(idx) = v }
    }

    #[inline(always)]
    fn step_point(left: f64, mid: f64, right: f64) -> f64 {
        0.125 * left + 0.75 * mid + 0.125 * right
    }
}

impl StencilKernel<1> for Heat1d {
    fn interior(&self, t0: i64, t1: i64, grid: &GridInfo<1>) {
        let w = self.width as usize;
        for t in t0..t1 {
            let dt = t - t0;
            let xs = grid.x0[0] + grid.dx0[0] * dt;
            let xe = grid.x1[0] + grid.dx1[0] * dt;
            let cur = (t & 1) as usize * w;
            let nxt = w - cur;
            for x in xs..xe {
                let x = x as usize;
                unsafe {
                    let v = Self::step_point(
                        self.read(cur + x - 1),
                        self.read(cur + x),
                        self.read(cur + x + 1),
                    );
                    self.write(nxt + x, v);
                }
            }
        }
    }

    fn boundary(&self, t0: i64, t1: i64, grid: &GridInfo<1>) {
        let w = self.width as usize;
        let phys = self.width;
        for t in t0..t1 {
            let dt = t - t0;
            let xs = grid.x0[0] + grid.dx0[0] * dt;
            let xe = grid.x1[0] + grid.dx1[0] * dt;
            let cur = (t & 1) as usize * w;
            let nxt = w - cur;
            for x in xs..xe {
                let mid = x.rem_euclid(phys) as usize;
                let left = (x - 1).rem_euclid(phys) as usize;
                let right = (x + 1).rem_euclid(phys) as usize;
                unsafe {
                    let v = Self::step_point(
                        self.read(cur + left),
                        self.read(cur + mid),
                        self.read(cur + right),
                    );
                    self.write(nxt + mid, v);
                }
            }
        }
    }
}

/// Straight row-by-row 1-D stepper, the correctness and speed baseline.
/// `cells` is a `2 * width` double buffer laid out like [`Heat1d`]'s.
pub fn naive_step_1d(width: i64, cells: &mut [f64], t0: i64, t1: i64) {
    let w = width as usize;
    for t in t0..t1 {
        let (cur, next) = halves(cells, w, t);
        for x in 0..w {
            let left = if x == 0 { w - 1 } else { x - 1 };
            let right = if x + 1 == w { 0 } else { x + 1 };
            next[x] = Heat1d::step_point(cur[left], cur[x], cur[right]);
        }
    }
}

// ── 2-D ─────────────────────────────────────────────────────────────────

/// 2-D periodic heat diffusion, five-point stencil. Dimension 0 is the
/// outer (row) axis of the backing buffer.
pub struct Heat2d {
    len: [i64; 2],
    cells: Box<[UnsafeCell<f64>]>,
}

unsafe impl Sync for Heat2d {}

impl Heat2d {
    pub fn new(len: [i64; 2]) -> Self {
        assert!(len[0] > 0 && len[1] > 0);
        let plane = (len[0] * len[1]) as usize;
        Self {
            len,
            cells: cell_buf(2 * plane),
        }
    }

    pub fn seed(&mut self, seed: u64) {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let plane = (self.len[0] * self.len[1]) as usize;
        for i in 0..plane {
            *self.cells[i].get_mut() = rng.random::<f64>();
            *self.cells[plane + i].get_mut() = 0.0;
        }
    }

    /// Snapshot of the state at time `t`, row-major.
    pub fn plane(&mut self, t: i64) -> Vec<f64> {
        let plane = (self.len[0] * self.len[1]) as usize;
        let base = (t & 1) as usize * plane;
        self.cells[base..base + plane]
            .iter_mut()
            .map(|c| *c.get_mut())
            .collect()
    }

    /// Raw pointer to cell `idx`. No reference to the buffer is formed.
    #[inline(always)]
    fn cell(&self, idx: usize) -> *mut f64 {
        debug_assert!(idx < self.cells.len());
        UnsafeCell::raw_get(&self.cells[idx])
    }

    /// # Safety
    /// `idx` must be in bounds and no concurrent write may target it.
    #[inline(always)]
    unsafe fn read(&self, idx: usize) -> f64 {
        unsafe { *self.cell(idx) }
    }

    /// # Safety
    /// `idx` must be in bounds and no concurrent access may target it.
    #[inline(always)]
    unsafe fn write(&self, idx: usize, v: f64) {
        unsafe { *self.cell(idx) = v }
    }

    #[inline(always)]
    fn step_point(c: f64, up: f64, down: f64, left: f64, right: f64) -> f64 {
        0.5 * c + 0.125 * (up + down + left + right)
    }
}

impl StencilKernel<2> for Heat2d {
    fn interior(&self, t0: i64, t1: i64, grid: &GridInfo<2>) {
        let stride = self.len[1] as usize;
        let plane = self.len[0] as usize * stride;
        for t in t0..t1 {
            let dt = t - t0;
            let is = grid.x0[0] + grid.dx0[0] * dt;
            let ie = grid.x1[0] + grid.dx1[0] * dt;
            let js = grid.x0[1] + grid.dx0[1] * dt;
            let je = grid.x1[1] + grid.dx1[1] * dt;
            let cur = (t & 1) as usize * plane;
            let nxt = plane - cur;
            for i in is..ie {
                for j in js..je {
                    let c = i as usize * stride + j as usize;
                    unsafe {
                        let v = Self::step_point(
                            self.read(cur + c),
                            self.read(cur + c - stride),
                            self.read(cur + c + stride),
                            self.read(cur + c - 1),
                            self.read(cur + c + 1),
                        );
                        self.write(nxt + c, v);
                    }
                }
            }
        }
    }

    fn boundary(&self, t0: i64, t1: i64, grid: &GridInfo<2>) {
        let [ni, nj] = self.len;
        let plane = (ni * nj) as usize;
        for t in t0..t1 {
            let dt = t - t0;
            let is = grid.x0[0] + grid.dx0[0] * dt;
            let ie = grid.x1[0] + grid.dx1[0] * dt;
            let js = grid.x0[1] + grid.dx0[1] * dt;
            let je = grid.x1[1] + grid.dx1[1] * dt;
            let cur = (t & 1) as usize * plane;
            let nxt = plane - cur;
            for i in is..ie {
                let row = (i.rem_euclid(ni) * nj) as usize;
                let up = ((i - 1).rem_euclid(ni) * nj) as usize;
                let down = ((i + 1).rem_euclid(ni) * nj) as usize;
                for j in js..je {
                    let wj = j.rem_euclid(nj) as usize;
                    let left = (j - 1).rem_euclid(nj) as usize;
                    let right = (j + 1).rem_euclid(nj) as usize;
                    unsafe {
                        let v = Self::step_point(
                            self.read(cur + row + wj),
                            self.read(cur + up + wj),
                            self.read(cur + down + wj),
                            self.read(cur + row + left),
                            self.read(cur + row + right),
                        );
                        self.write(nxt + row + wj, v);
                    }
                }
            }
        }
    }
}

/// Straight plane-by-plane 2-D stepper. `cells` is a `2 * ni * nj` double
/// buffer laid out like [`Heat2d`]'s.
pub fn naive_step_2d(len: [i64; 2], cells: &mut [f64], t0: i64, t1: i64) {
    let [ni, nj] = len;
    let plane = (ni * nj) as usize;
    for t in t0..t1 {
        let (cur, next) = halves(cells, plane, t);
        for i in 0..ni {
            let up = ((i - 1).rem_euclid(ni) * nj) as usize;
            let down = ((i + 1).rem_euclid(ni) * nj) as usize;
            let row = (i * nj) as usize;
            for j in 0..nj {
                let left = (j - 1).rem_euclid(nj) as usize;
                let right = (j + 1).rem_euclid(nj) as usize;
                let j = j as usize;
                next[row + j] = Heat2d::step_point(
                    cur[row + j],
                    cur[up + j],
                    cur[down + j],
                    cur[row + left],
                    cur[row + right],
                );
            }
        }
    }
}
