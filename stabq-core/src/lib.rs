//! Core types for the stabq quantum register simulator
//!
//! This crate provides the pieces every engine shares:
//!
//! - **Numerics**: fixed-precision real/complex scalars and 2x2 payload
//!   matrices, with precision selected at compile time
//! - **Dispatch queue**: a single-consumer FIFO for deferred in-order
//!   work, used by engines to serialize state mutation
//! - **Simulator capability**: the abstract operation set a circuit
//!   lowers onto
//! - **Circuit rewriter**: gates that combine, cancel and commute as
//!   they are appended, plus two lowering strategies
//! - **Serialization**: the whitespace-delimited textual circuit format
//!
//! # Quick start
//!
//! ```
//! use stabq_core::{Circuit, CircuitGate, Matrix2, QubitId};
//!
//! let mut circuit = Circuit::new(2);
//! circuit.append_gate(CircuitGate::new(QubitId::new(0), Matrix2::HADAMARD));
//! circuit.append_gate(
//!     CircuitGate::with_controls(QubitId::new(1), Matrix2::PAULI_X, [QubitId::new(0)], 1)
//!         .unwrap(),
//! );
//! assert_eq!(circuit.len(), 2);
//!
//! // Textual round trip is exact at the active precision.
//! let copy: Circuit = circuit.to_string().parse().unwrap();
//! assert_eq!(copy, circuit);
//! ```

pub mod circuit;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod matrix;
pub mod numeric;
pub mod qubit;
pub mod serialization;
pub mod simulator;

pub use circuit::Circuit;
pub use dispatch::DispatchQueue;
pub use error::{QuantumError, Result};
pub use gate::CircuitGate;
pub use matrix::{Matrix2, MatrixKind};
pub use numeric::{Complex, Real, NORM_EPSILON};
pub use qubit::{perm_count, Permutation, QubitId};
pub use simulator::Simulator;
