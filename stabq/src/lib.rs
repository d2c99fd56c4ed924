//! Universal quantum register simulation on the stabilizer tableau
//!
//! `stabq` bundles the two tightly-coupled subsystems of the workspace:
//!
//! - [`StabilizerState`]: an Aaronson-Gottesman tableau engine with a
//!   global phase offset, serving as both a Clifford simulator and an
//!   amplitude oracle
//! - [`Circuit`]: an append-time canonicalizing gate rewriter that
//!   lowers onto anything implementing the [`Simulator`] capability
//!
//! # Example
//!
//! ```
//! use stabq::{Circuit, CircuitGate, Matrix2, QubitId, StabilizerState};
//!
//! let mut circuit = Circuit::new(2);
//! circuit.append_gate(CircuitGate::new(QubitId::new(0), Matrix2::HADAMARD));
//! circuit.append_gate(
//!     CircuitGate::with_controls(QubitId::new(1), Matrix2::PAULI_X, [QubitId::new(0)], 1)
//!         .unwrap(),
//! );
//!
//! let mut state = StabilizerState::new(2);
//! circuit.run(&mut state).unwrap();
//! assert_eq!(state.prob(1).unwrap(), 0.5);
//! ```

pub use stabq_core::{
    perm_count, Circuit, CircuitGate, Complex, DispatchQueue, Matrix2, MatrixKind, Permutation,
    QuantumError, QubitId, Real, Result, Simulator, NORM_EPSILON,
};
pub use stabq_tableau::{AmplitudeEntry, PhaseRepairPolicy, Separability, StabilizerState};
