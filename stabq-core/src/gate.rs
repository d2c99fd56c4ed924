//! One gate node of a rewritable circuit
//!
//! A gate acts on `target`, conditioned on an ordered set of control
//! qubits. `payloads` maps a control pattern (bit `i` set means the
//! `i`-th control in ascending order must read |1>) to the 2x2 matrix
//! applied under that pattern; patterns absent from the map act as the
//! identity. A gate with one control and no payloads encodes a SWAP of
//! target and control.

use crate::error::{QuantumError, Result};
use crate::matrix::Matrix2;
use crate::qubit::{Permutation, QubitId};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

/// A single gate in a [`Circuit`](crate::Circuit)
///
/// # Example
/// ```
/// use stabq_core::{CircuitGate, Matrix2, QubitId};
///
/// let mut h = CircuitGate::new(QubitId::new(0), Matrix2::HADAMARD);
/// let h2 = CircuitGate::new(QubitId::new(0), Matrix2::HADAMARD);
/// assert!(h.try_combine(&h2));
/// assert!(h.is_identity());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct CircuitGate {
    target: QubitId,
    controls: BTreeSet<QubitId>,
    payloads: BTreeMap<Permutation, Matrix2>,
}

impl CircuitGate {
    /// Single-qubit gate
    pub fn new(target: QubitId, m: Matrix2) -> Self {
        let mut payloads = BTreeMap::new();
        payloads.insert(0, m);
        Self {
            target,
            controls: BTreeSet::new(),
            payloads,
        }
    }

    /// Controlled gate applying `m` when the controls read `pattern`
    pub fn with_controls(
        target: QubitId,
        m: Matrix2,
        controls: impl IntoIterator<Item = QubitId>,
        pattern: Permutation,
    ) -> Result<Self> {
        let mut payloads = BTreeMap::new();
        payloads.insert(pattern, m);
        Self::from_raw(target, controls.into_iter().collect(), payloads)
    }

    /// Uniformly controlled gate from an explicit pattern-to-matrix map
    pub fn uniformly_controlled(
        target: QubitId,
        controls: impl IntoIterator<Item = QubitId>,
        payloads: BTreeMap<Permutation, Matrix2>,
    ) -> Result<Self> {
        Self::from_raw(target, controls.into_iter().collect(), payloads)
    }

    /// Swap-encoded gate: no payloads, one control
    pub fn swap_encoded(q1: QubitId, q2: QubitId) -> Self {
        let mut controls = BTreeSet::new();
        controls.insert(q2);
        Self {
            target: q1,
            controls,
            payloads: BTreeMap::new(),
        }
    }

    /// Build a gate from raw parts, validating controls and pattern keys
    pub fn from_raw(
        target: QubitId,
        controls: BTreeSet<QubitId>,
        payloads: BTreeMap<Permutation, Matrix2>,
    ) -> Result<Self> {
        if controls.contains(&target) {
            return Err(QuantumError::InvalidControl(target.index()));
        }
        if payloads.is_empty() && controls.len() != 1 {
            return Err(QuantumError::MalformedGate(
                "an empty payload map is only valid for a swap-encoded gate",
            ));
        }
        let limit = 1u64 << controls.len();
        for &pattern in payloads.keys() {
            if pattern >= limit {
                return Err(QuantumError::InvalidPattern {
                    pattern,
                    num_controls: controls.len(),
                });
            }
        }
        Ok(Self {
            target,
            controls,
            payloads,
        })
    }

    /// The target qubit
    #[inline]
    pub fn target(&self) -> QubitId {
        self.target
    }

    /// The control set, ascending
    #[inline]
    pub fn controls(&self) -> &BTreeSet<QubitId> {
        &self.controls
    }

    /// The pattern-to-matrix payload map
    #[inline]
    pub fn payloads(&self) -> &BTreeMap<Permutation, Matrix2> {
        &self.payloads
    }

    /// Controls as an ascending vector
    pub fn controls_vec(&self) -> SmallVec<[QubitId; 2]> {
        self.controls.iter().copied().collect()
    }

    /// Largest qubit index the gate touches
    pub fn max_qubit(&self) -> usize {
        self.controls
            .iter()
            .next_back()
            .map_or(self.target.index(), |c| c.index().max(self.target.index()))
    }

    /// The sole payload, when there is exactly one
    pub fn single_payload(&self) -> Option<(Permutation, &Matrix2)> {
        if self.payloads.len() == 1 {
            self.payloads.iter().next().map(|(&k, m)| (k, m))
        } else {
            None
        }
    }

    /// True when the gate acts as the identity on every pattern
    pub fn is_identity(&self) -> bool {
        !self.payloads.is_empty() && self.payloads.values().all(Matrix2::is_identity)
    }

    /// True when every payload is diagonal
    pub fn is_phase(&self) -> bool {
        self.payloads.values().all(Matrix2::is_diagonal)
    }

    /// True when every payload is anti-diagonal
    pub fn is_invert(&self) -> bool {
        self.payloads.values().all(Matrix2::is_anti_diagonal)
    }

    /// True for a SWAP encoded as an empty payload map with one control
    pub fn is_swap(&self) -> bool {
        self.payloads.is_empty() && self.controls.len() == 1
    }

    /// True for a plain CNOT: one control, the X payload on pattern 1
    pub fn is_cnot(&self) -> bool {
        self.controls.len() == 1
            && self.payloads.len() == 1
            && self
                .payloads
                .get(&1)
                .is_some_and(|m| m.approx_eq(&Matrix2::PAULI_X))
    }

    /// Can `other` be merged into this gate?
    pub fn can_combine(&self, other: &CircuitGate) -> bool {
        self.target == other.target && self.controls == other.controls
    }

    /// Merge `other` (applied after this gate) into this gate's payloads
    fn combine(&mut self, other: &CircuitGate) {
        for (&pattern, m) in &other.payloads {
            match self.payloads.get(&pattern) {
                Some(existing) => {
                    let product = m.mul(existing);
                    if product.is_identity() {
                        self.payloads.remove(&pattern);
                    } else {
                        self.payloads.insert(pattern, product);
                    }
                }
                None => {
                    self.payloads.insert(pattern, *m);
                }
            }
        }
        if self.payloads.is_empty() {
            // Fully cancelled: collapse to an explicit identity.
            self.controls.clear();
            self.payloads.insert(0, Matrix2::IDENTITY);
        }
    }

    /// Merge `other` into this gate when possible
    pub fn try_combine(&mut self, other: &CircuitGate) -> bool {
        if !self.can_combine(other) {
            return false;
        }
        self.combine(other);
        true
    }

    /// Does this gate commute with `other` syntactically?
    ///
    /// When an uncontrolled invert gate passes through a qubit that
    /// `other` uses as a control, `other`'s payload keys are re-indexed
    /// to reflect the flipped control value.
    pub fn can_pass(&self, other: &mut CircuitGate) -> bool {
        if let Some(pos) = other.controls.iter().position(|&c| c == self.target) {
            if self.controls.contains(&other.target) {
                return self.is_phase() && other.is_phase();
            }
            if self.is_phase() {
                return true;
            }
            if !self.controls.is_empty() || !self.is_invert() {
                return false;
            }

            let bit = 1u64 << pos;
            other.payloads = other
                .payloads
                .iter()
                .map(|(&pattern, m)| (pattern ^ bit, *m))
                .collect();
            true
        } else if self.controls.contains(&other.target) {
            other.is_phase()
        } else {
            self.target != other.target || (self.is_phase() && other.is_phase())
        }
    }

    /// Payload array for uniformly controlled lowering, one matrix per
    /// control pattern, missing patterns filled with the identity
    pub fn uniformly_controlled_payload(&self) -> Vec<Matrix2> {
        let count = 1usize << self.controls.len();
        (0..count)
            .map(|pattern| {
                self.payloads
                    .get(&(pattern as Permutation))
                    .copied()
                    .unwrap_or(Matrix2::IDENTITY)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::{I_C, ONE_C, ZERO_C};

    fn q(i: usize) -> QubitId {
        QubitId::new(i)
    }

    #[test]
    fn test_rejects_control_on_target() {
        let err = CircuitGate::with_controls(q(0), Matrix2::PAULI_X, [q(0)], 1).unwrap_err();
        assert!(matches!(err, QuantumError::InvalidControl(0)));
    }

    #[test]
    fn test_rejects_wide_pattern() {
        let err = CircuitGate::with_controls(q(0), Matrix2::PAULI_X, [q(1)], 2).unwrap_err();
        assert!(matches!(err, QuantumError::InvalidPattern { .. }));
    }

    #[test]
    fn test_hh_cancels() {
        let mut h = CircuitGate::new(q(0), Matrix2::HADAMARD);
        assert!(h.try_combine(&CircuitGate::new(q(0), Matrix2::HADAMARD)));
        assert!(h.is_identity());
        assert!(h.controls().is_empty());
    }

    #[test]
    fn test_combine_requires_same_controls() {
        let mut cx = CircuitGate::with_controls(q(1), Matrix2::PAULI_X, [q(0)], 1).unwrap();
        let x = CircuitGate::new(q(1), Matrix2::PAULI_X);
        assert!(!cx.try_combine(&x));
    }

    #[test]
    fn test_combine_fills_missing_pattern() {
        let mut g = CircuitGate::with_controls(q(1), Matrix2::PAULI_X, [q(0)], 1).unwrap();
        let other = CircuitGate::with_controls(q(1), Matrix2::PAULI_Z, [q(0)], 0).unwrap();
        assert!(g.try_combine(&other));
        assert_eq!(g.payloads().len(), 2);
        assert!(g.payloads()[&0].approx_eq(&Matrix2::PAULI_Z));
        assert!(g.payloads()[&1].approx_eq(&Matrix2::PAULI_X));
    }

    #[test]
    fn test_s_and_sdag_cancel_under_control() {
        let mut g = CircuitGate::with_controls(q(1), Matrix2::S, [q(0)], 1).unwrap();
        let other = CircuitGate::with_controls(q(1), Matrix2::S_DAG, [q(0)], 1).unwrap();
        assert!(g.try_combine(&other));
        assert!(g.is_identity());
    }

    #[test]
    fn test_is_cnot() {
        let cx = CircuitGate::with_controls(q(1), Matrix2::PAULI_X, [q(0)], 1).unwrap();
        assert!(cx.is_cnot());
        let cz = CircuitGate::with_controls(q(1), Matrix2::PAULI_Z, [q(0)], 1).unwrap();
        assert!(!cz.is_cnot());
        let anti_cx = CircuitGate::with_controls(q(1), Matrix2::PAULI_X, [q(0)], 0).unwrap();
        assert!(!anti_cx.is_cnot());
    }

    #[test]
    fn test_disjoint_gates_pass() {
        let h0 = CircuitGate::new(q(0), Matrix2::HADAMARD);
        let mut h1 = CircuitGate::new(q(1), Matrix2::HADAMARD);
        assert!(h0.can_pass(&mut h1));
    }

    #[test]
    fn test_same_target_phases_pass() {
        let s = CircuitGate::new(q(0), Matrix2::S);
        let mut z = CircuitGate::new(q(0), Matrix2::PAULI_Z);
        assert!(s.can_pass(&mut z));
        let mut h = CircuitGate::new(q(0), Matrix2::HADAMARD);
        assert!(!s.can_pass(&mut h));
    }

    #[test]
    fn test_phase_on_control_passes() {
        // S on a qubit the other gate only uses as a control commutes.
        let s = CircuitGate::new(q(0), Matrix2::S);
        let mut cx = CircuitGate::with_controls(q(1), Matrix2::PAULI_X, [q(0)], 1).unwrap();
        assert!(s.can_pass(&mut cx));
        assert_eq!(cx.payloads().len(), 1);
        assert!(cx.payloads().contains_key(&1));
    }

    #[test]
    fn test_x_through_control_rekeys_payloads() {
        let x = CircuitGate::new(q(0), Matrix2::PAULI_X);
        let mut cx = CircuitGate::with_controls(q(1), Matrix2::PAULI_X, [q(0)], 1).unwrap();
        assert!(x.can_pass(&mut cx));
        // The control value is inverted, so the payload moves to key 0.
        assert_eq!(cx.payloads().len(), 1);
        assert!(cx.payloads().contains_key(&0));
    }

    #[test]
    fn test_target_under_other_control_blocks_invert() {
        // CX(0->1) cannot pass X(1)'s target... but an X on the *control*
        // qubit of the earlier gate can, per the rekey rule above. A
        // controlled gate, by contrast, is stuck.
        let cx = CircuitGate::with_controls(q(1), Matrix2::PAULI_X, [q(0)], 1).unwrap();
        let mut cz = CircuitGate::with_controls(q(0), Matrix2::PAULI_Z, [q(2)], 1).unwrap();
        // cx's target (1) is not in cz; cz's target is 0, a control of cx:
        // passes only if cz is all-phase, which it is.
        assert!(cx.can_pass(&mut cz));
        let mut c_invert = CircuitGate::with_controls(q(0), Matrix2::PAULI_X, [q(2)], 1).unwrap();
        assert!(!cx.can_pass(&mut c_invert));
    }

    #[test]
    fn test_uniformly_controlled_payload_fills_identity() {
        let g = CircuitGate::with_controls(q(2), Matrix2::PAULI_X, [q(0), q(1)], 2).unwrap();
        let payload = g.uniformly_controlled_payload();
        assert_eq!(payload.len(), 4);
        assert!(payload[0].is_identity());
        assert!(payload[1].is_identity());
        assert!(payload[2].approx_eq(&Matrix2::PAULI_X));
        assert!(payload[3].is_identity());
    }

    #[test]
    fn test_swap_encoded() {
        let g = CircuitGate::swap_encoded(q(0), q(1));
        assert!(g.is_swap());
        assert!(!g.is_identity());
    }

    #[test]
    fn test_combine_order_matters() {
        // S then X is XS, not SX.
        let mut s = CircuitGate::new(q(0), Matrix2::S);
        assert!(s.try_combine(&CircuitGate::new(q(0), Matrix2::PAULI_X)));
        let expected = Matrix2::new(ZERO_C, I_C, ONE_C, ZERO_C);
        assert!(s.payloads()[&0].approx_eq(&expected));
    }
}
