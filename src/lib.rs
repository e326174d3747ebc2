// ============================================================
// accent-shift
// ============================================================
// Maps one speaker's cepstral features onto another's:
//
//   corpus ─▶ FastDTW align ─▶ corrupt ─▶ pad/mask ─▶ batches
//                                                       │
//                 weights + loss history ◀── train ◀────┘
//
// The binary in main.rs is a thin clap front end. The library
// exposes the same layers so a caller can plug in its own
// WaveformSynthesizer or cancel a run from another thread.
//
// Reference: Rust Book §7 (Packages and Crates)

#![recursion_limit = "256"]

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;
