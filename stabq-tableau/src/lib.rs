//! Stabilizer tableau simulation with a global phase offset
//!
//! This crate simulates Clifford circuits in polynomial space and time
//! using the Aaronson-Gottesman tableau (CHP), extended with a
//! unit-modulus phase offset so the register doubles as an amplitude
//! oracle. Beyond the Clifford gate set it supports measurement (free,
//! forced, or non-collapsing), amplitude and probability queries, basis
//! enumeration, register composition and decomposition, and per-qubit
//! separability oracles.
//!
//! All mutations are serialized through a per-register
//! [`DispatchQueue`](stabq_core::DispatchQueue); reads drain the queue
//! before observing the tableau, so callers on multiple threads see a
//! totally ordered history.
//!
//! # Example
//!
//! ```
//! use stabq_tableau::StabilizerState;
//!
//! // A GHZ state: the support is {|000>, |111>}.
//! let mut state = StabilizerState::new(3);
//! state.h(0).unwrap();
//! state.cnot(0, 1).unwrap();
//! state.cnot(1, 2).unwrap();
//! assert_eq!(state.perm_count().unwrap(), 2);
//! let support: Vec<u64> = state.get_quantum_state().unwrap().into_keys().collect();
//! assert_eq!(support, vec![0, 7]);
//! ```

mod amplitude;
mod compose;
mod rows;
mod sim_impl;
mod state;

pub use compose::Separability;
pub use state::{AmplitudeEntry, PhaseRepairPolicy, StabilizerState};
