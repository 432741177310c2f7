// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — CCP Engine
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Request orchestrator: composes material preparation, the electrostatic
//! and electron-density solves and the diagnostics layer, with an optional
//! perturbed re-solve for A/B comparison.
//!
//! The engine is synchronous, single-threaded and deterministic; identical
//! requests produce bit-identical results. Concurrency bounds, timeouts
//! and cancellation belong to the caller.

pub mod pipeline;

pub use pipeline::run_simulation;
