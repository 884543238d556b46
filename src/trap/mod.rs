//! Trapezoidal space-time decomposition engine internals and public API.

mod cuts;
mod decision;
mod grid;
mod projection;
mod replay;
mod symbolic;
mod zoid;

pub use decision::{Decision, DimDecision};
pub use grid::{derive_shape, DimShape, Domain, GridInfo, ZoidShape, WIDTH_BITS};
pub use symbolic::{AutoTuner, StencilKernel, TuneReport, TunerConfig};
pub use zoid::{SimpleZoid, Zoid, ZoidArena, ZoidIdx};
