//! Error types shared across the simulator capability surface

use thiserror::Error;

/// Errors raised by circuits, simulators and the stabilizer engine
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuantumError {
    /// Qubit index outside the register
    #[error("invalid qubit index {index}: register has {num_qubits} qubits")]
    InvalidQubit { index: usize, num_qubits: usize },

    /// A control duplicates the target or another control
    #[error("control qubit {0} collides with the target or another control")]
    InvalidControl(usize),

    /// A control pattern references more controls than the gate has
    #[error("control pattern {pattern} out of range for {num_controls} controls")]
    InvalidPattern { pattern: u64, num_controls: usize },

    /// Basis-state index outside the register's state space
    #[error("permutation {permutation} out of range for {num_qubits} qubits")]
    InvalidPermutation { permutation: u64, num_qubits: usize },

    /// Payload array length does not cover every control pattern
    #[error("got {actual} payloads, expected {expected} (one per control pattern)")]
    PayloadCountMismatch { expected: usize, actual: usize },

    /// The matrix cannot be applied on the stabilizer representation
    #[error("matrix is not supported on the stabilizer representation: {0}")]
    UnsupportedMatrix(&'static str),

    /// Amplitudes cannot be written directly into a stabilizer register
    #[error("cannot set amplitudes directly on a stabilizer register")]
    SetAmplitudeUnsupported,

    /// The qubit range is entangled with the rest of the register
    #[error("qubit range [{start}, {end}) is entangled with the rest of the register")]
    DecomposeFailed { start: usize, end: usize },

    /// Structurally invalid gate
    #[error("malformed gate: {0}")]
    MalformedGate(&'static str),

    /// `finish()` called from inside a dispatched operation
    #[error("finish() called from inside a dispatched operation")]
    QueueMisuse,

    /// No permutation has support in both states during phase repair
    #[error("global phase repair found no permutation with support in both states")]
    PhaseRepairFailed,

    /// Malformed circuit text
    #[error("circuit parse error: {0}")]
    Parse(String),
}

impl QuantumError {
    /// Create an invalid qubit error
    pub fn invalid_qubit(index: usize, num_qubits: usize) -> Self {
        Self::InvalidQubit { index, num_qubits }
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

/// Type alias for results in stabq
pub type Result<T> = std::result::Result<T, QuantumError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_qubit_message() {
        let err = QuantumError::invalid_qubit(5, 3);
        let msg = format!("{}", err);
        assert!(msg.contains('5'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_parse_message() {
        let err = QuantumError::parse("expected gate count");
        assert!(format!("{}", err).contains("expected gate count"));
    }
}
