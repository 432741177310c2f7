//! Electrostatic + drift-diffusion core for axisymmetric CCP chambers.
//!
//! Material/boundary preparation, influence maps, the Poisson solve and the
//! Scharfetter-Gummel electron-density solve with empirical closures.

pub mod boundary;
pub mod drift_diffusion;
pub mod flow;
pub mod influence;
pub mod materials;
pub mod poisson;
pub mod rf_drive;
pub mod species;
pub mod transport;
