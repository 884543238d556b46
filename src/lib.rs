//! Auto-tuning cache-oblivious trapezoidal decomposition for stencils.

pub mod heat;
pub mod trap;
pub use trap::{AutoTuner, Decision, Domain, GridInfo, StencilKernel, TuneReport, TunerConfig};
