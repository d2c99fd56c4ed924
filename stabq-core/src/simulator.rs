//! The simulator capability: the operation set a circuit lowers onto
//!
//! Any engine that can apply single-qubit matrices with classical
//! controls can run a rewritten circuit. The stabilizer tableau
//! implements the Clifford/Pauli subset and reports `UnsupportedMatrix`
//! for anything else; a dense state-vector engine implements all of it.

use crate::error::{QuantumError, Result};
use crate::matrix::Matrix2;
use crate::qubit::{Permutation, QubitId};
use smallvec::SmallVec;

/// Abstract quantum register operations consumed by the circuit rewriter
///
/// Control-pattern bit `i` of a key or pattern corresponds to the `i`-th
/// control in ascending qubit order.
pub trait Simulator {
    /// Number of qubits currently in the register
    fn qubit_count(&self) -> usize;

    /// Append `length` qubits in the |0...0> state
    fn allocate(&mut self, length: usize) -> Result<()>;

    /// Apply a single-qubit matrix
    fn mtrx(&mut self, m: &Matrix2, target: QubitId) -> Result<()>;

    /// Apply `m` on `target` when every control reads |1>
    fn mc_mtrx(&mut self, controls: &[QubitId], m: &Matrix2, target: QubitId) -> Result<()>;

    /// Apply `m` on `target` when every control reads |0>
    fn mac_mtrx(&mut self, controls: &[QubitId], m: &Matrix2, target: QubitId) -> Result<()>;

    /// Apply `m` on `target` when the controls read exactly `pattern`
    ///
    /// The default lowers onto `mc_mtrx` by conjugating the controls whose
    /// pattern bit is clear with X.
    fn uc_mtrx(
        &mut self,
        controls: &[QubitId],
        m: &Matrix2,
        target: QubitId,
        pattern: Permutation,
    ) -> Result<()> {
        if pattern >= (1u64 << controls.len()) {
            return Err(QuantumError::InvalidPattern {
                pattern,
                num_controls: controls.len(),
            });
        }
        let flipped: SmallVec<[QubitId; 2]> = controls
            .iter()
            .enumerate()
            .filter(|(i, _)| (pattern >> i) & 1 == 0)
            .map(|(_, &c)| c)
            .collect();
        for &c in &flipped {
            self.x(c)?;
        }
        let result = self.mc_mtrx(controls, m, target);
        for &c in &flipped {
            self.x(c)?;
        }
        result
    }

    /// Apply one of `2^k` payloads on `target`, selected by the classical
    /// pattern of the `k` controls
    ///
    /// `payloads` is indexed by control pattern. The default emits one
    /// `uc_mtrx` per non-identity payload; the patterns are disjoint, so
    /// order does not matter.
    fn uniformly_controlled(
        &mut self,
        controls: &[QubitId],
        target: QubitId,
        payloads: &[Matrix2],
    ) -> Result<()> {
        let expected = 1usize << controls.len();
        if payloads.len() != expected {
            return Err(QuantumError::PayloadCountMismatch {
                expected,
                actual: payloads.len(),
            });
        }
        for (pattern, m) in payloads.iter().enumerate() {
            if !m.is_identity() {
                self.uc_mtrx(controls, m, target, pattern as Permutation)?;
            }
        }
        Ok(())
    }

    /// Exchange two qubits
    fn swap(&mut self, a: QubitId, b: QubitId) -> Result<()>;

    /// Apply a Pauli X
    fn x(&mut self, q: QubitId) -> Result<()>;
}
