//! Incrementally canonicalized gate sequences
//!
//! `append_gate` keeps the list in a local canonical form: no adjacent
//! pair can be combined, and no gate can be commuted earlier without
//! hitting a non-passing neighbor. Lowering onto a [`Simulator`] first
//! collapses CNOT triplets into swaps, then emits each gate through the
//! narrowest capability that fits. An alternative lowering defers
//! pending X conjugations per qubit to minimize emitted X gates.

use crate::error::Result;
use crate::gate::CircuitGate;
use crate::matrix::Matrix2;
use crate::qubit::QubitId;
use crate::simulator::Simulator;
use std::collections::VecDeque;

/// A rewritable sequence of gates over a growable register
///
/// # Example
/// ```
/// use stabq_core::{Circuit, CircuitGate, Matrix2, QubitId};
///
/// let mut circuit = Circuit::new(1);
/// circuit.append_gate(CircuitGate::new(QubitId::new(0), Matrix2::HADAMARD));
/// circuit.append_gate(CircuitGate::new(QubitId::new(0), Matrix2::HADAMARD));
/// // The pair cancelled on append.
/// assert!(circuit.is_empty());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Circuit {
    qubit_count: usize,
    gates: VecDeque<CircuitGate>,
}

impl Circuit {
    /// Create an empty circuit; the register grows to cover appended gates
    pub fn new(qubit_count: usize) -> Self {
        Self {
            qubit_count,
            gates: VecDeque::new(),
        }
    }

    /// Reassemble a circuit from parts, e.g. after parsing
    ///
    /// The gate list is taken as-is; only `append_gate` canonicalizes.
    pub fn from_parts(qubit_count: usize, gates: impl IntoIterator<Item = CircuitGate>) -> Self {
        let gates: VecDeque<CircuitGate> = gates.into_iter().collect();
        let qubit_count = gates
            .iter()
            .map(|g| g.max_qubit() + 1)
            .chain([qubit_count])
            .max()
            .unwrap_or(0);
        Self { qubit_count, gates }
    }

    /// Number of qubits the circuit spans so far
    #[inline]
    pub fn qubit_count(&self) -> usize {
        self.qubit_count
    }

    /// Number of gates after canonicalization
    #[inline]
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// True when no gates remain
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Iterate the canonicalized gate list, front to back
    pub fn gates(&self) -> impl Iterator<Item = &CircuitGate> {
        self.gates.iter()
    }

    /// Append a gate, canonicalizing in place
    ///
    /// Scans from the back: merges into the first combinable gate
    /// (re-appending every later gate when the merge cancels to the
    /// identity, which can cascade), or inserts after the first gate the
    /// new one cannot commute past.
    pub fn append_gate(&mut self, gate: CircuitGate) {
        if gate.is_identity() {
            return;
        }

        self.qubit_count = self.qubit_count.max(gate.max_qubit() + 1);

        let mut gate = gate;
        for idx in (0..self.gates.len()).rev() {
            if self.gates[idx].try_combine(&gate) {
                if self.gates[idx].is_identity() {
                    self.gates.remove(idx);
                    let tail: Vec<CircuitGate> = self.gates.drain(idx..).collect();
                    for later in tail {
                        self.append_gate(later);
                    }
                }
                return;
            }
            if !self.gates[idx].can_pass(&mut gate) {
                self.gates.insert(idx + 1, gate);
                return;
            }
        }

        self.gates.push_front(gate);
    }

    /// Append a SWAP as its CNOT triplet
    ///
    /// Constructing every swap in the same low-to-high order raises the
    /// chance of adjacent triplets combining away.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) {
        if q1 == q2 {
            return;
        }
        let (lo, hi) = if q1 < q2 { (q1, q2) } else { (q2, q1) };

        let cnot = |target: QubitId, control: QubitId| {
            CircuitGate::with_controls(target, Matrix2::PAULI_X, [control], 1)
                .expect("distinct qubits form a valid CNOT")
        };
        self.append_gate(cnot(lo, hi));
        self.append_gate(cnot(hi, lo));
        self.append_gate(cnot(lo, hi));
    }

    /// Replace each `CNOT(a,b) CNOT(b,a) CNOT(a,b)` run with a swap gate
    fn collapse_triplets(&self) -> Vec<CircuitGate> {
        let gates: Vec<&CircuitGate> = self.gates.iter().collect();
        let mut out = Vec::with_capacity(gates.len());
        let mut i = 0;
        while i < gates.len() {
            if i + 2 < gates.len() && Self::is_swap_triplet(gates[i], gates[i + 1], gates[i + 2]) {
                let control = gates[i]
                    .controls()
                    .iter()
                    .next()
                    .copied()
                    .expect("CNOT has one control");
                out.push(CircuitGate::swap_encoded(gates[i].target(), control));
                i += 3;
            } else {
                out.push(gates[i].clone());
                i += 1;
            }
        }
        out
    }

    fn is_swap_triplet(a: &CircuitGate, b: &CircuitGate, c: &CircuitGate) -> bool {
        if !a.is_cnot() || !b.is_cnot() || !c.is_cnot() {
            return false;
        }
        let a_control = a.controls().iter().next().copied();
        let b_control = b.controls().iter().next().copied();
        b_control == Some(a.target())
            && a_control == Some(b.target())
            && c.target() == a.target()
            && c.controls() == a.controls()
    }

    /// Lower the circuit onto a simulator
    pub fn run<S: Simulator + ?Sized>(&self, sim: &mut S) -> Result<()> {
        self.grow(sim)?;
        for gate in self.collapse_triplets() {
            Self::emit(&gate, sim)?;
        }
        Ok(())
    }

    /// Lower the circuit with per-qubit control-state deferral
    ///
    /// Pending X conjugations are tracked lazily and absorbed into later
    /// emissions: an uncontrolled payload absorbs the X by column
    /// inversion, and a single-payload controlled gate flips whichever
    /// half of its controls is cheaper, emitting `mc_mtrx` or `mac_mtrx`
    /// accordingly. At most ceil(k/2) X gates are emitted per k-controlled
    /// gate, plus one for a pending target. Remaining flags are flushed
    /// at the end.
    pub fn run_deferred<S: Simulator + ?Sized>(&self, sim: &mut S) -> Result<()> {
        self.grow(sim)?;
        let mut pending = vec![false; self.qubit_count.max(sim.qubit_count())];

        for gate in self.collapse_triplets() {
            let t = gate.target();

            if gate.is_swap() {
                let control = gate
                    .controls()
                    .iter()
                    .next()
                    .copied()
                    .expect("swap gate has one control");
                // A pending X rides along with the swapped qubit.
                pending.swap(control.index(), t.index());
                sim.swap(control, t)?;
                continue;
            }

            if gate.controls().is_empty() {
                let (_, m) = gate.single_payload().expect("uncontrolled gate has payload 0");
                if pending[t.index()] {
                    pending[t.index()] = false;
                    sim.mtrx(&m.invert_columns(), t)?;
                } else {
                    sim.mtrx(m, t)?;
                }
                continue;
            }

            if let Some((pattern, m)) = gate.single_payload() {
                if pending[t.index()] {
                    pending[t.index()] = false;
                    sim.x(t)?;
                }
                let controls = gate.controls_vec();
                // A control "fits" mc_mtrx when its physical value must be
                // |1> for the gate to fire, given the pending conjugation.
                let fits: Vec<bool> = controls
                    .iter()
                    .enumerate()
                    .map(|(i, c)| ((pattern >> i) & 1 == 1) != pending[c.index()])
                    .collect();
                let mismatches = fits.iter().filter(|&&f| !f).count();

                let flip_fitting = 2 * mismatches > controls.len();
                for (i, &c) in controls.iter().enumerate() {
                    if fits[i] == flip_fitting {
                        pending[c.index()] = !pending[c.index()];
                        sim.x(c)?;
                    }
                }
                if flip_fitting {
                    sim.mac_mtrx(&controls, m, t)?;
                } else {
                    sim.mc_mtrx(&controls, m, t)?;
                }
                continue;
            }

            // Dense or uniformly controlled: un-defer everything involved.
            for q in gate.controls().iter().copied().chain([t]) {
                if pending[q.index()] {
                    pending[q.index()] = false;
                    sim.x(q)?;
                }
            }
            Self::emit(&gate, sim)?;
        }

        for (q, flag) in pending.iter().enumerate() {
            if *flag {
                sim.x(QubitId::new(q))?;
            }
        }
        Ok(())
    }

    fn grow<S: Simulator + ?Sized>(&self, sim: &mut S) -> Result<()> {
        if sim.qubit_count() < self.qubit_count {
            sim.allocate(self.qubit_count - sim.qubit_count())?;
        }
        Ok(())
    }

    fn emit<S: Simulator + ?Sized>(gate: &CircuitGate, sim: &mut S) -> Result<()> {
        let t = gate.target();

        if gate.controls().is_empty() {
            let (_, m) = gate.single_payload().expect("uncontrolled gate has payload 0");
            return sim.mtrx(m, t);
        }

        let controls = gate.controls_vec();

        if gate.payloads().is_empty() {
            return sim.swap(controls[0], t);
        }

        if let Some((pattern, m)) = gate.single_payload() {
            return sim.uc_mtrx(&controls, m, t, pattern);
        }

        sim.uniformly_controlled(&controls, t, &gate.uniformly_controlled_payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(i: usize) -> QubitId {
        QubitId::new(i)
    }

    fn h(t: usize) -> CircuitGate {
        CircuitGate::new(q(t), Matrix2::HADAMARD)
    }

    fn x(t: usize) -> CircuitGate {
        CircuitGate::new(q(t), Matrix2::PAULI_X)
    }

    fn cnot(c: usize, t: usize) -> CircuitGate {
        CircuitGate::with_controls(q(t), Matrix2::PAULI_X, [q(c)], 1).unwrap()
    }

    #[test]
    fn test_identity_is_dropped() {
        let mut circuit = Circuit::new(1);
        circuit.append_gate(CircuitGate::new(q(0), Matrix2::IDENTITY));
        assert!(circuit.is_empty());
    }

    #[test]
    fn test_qubit_count_grows() {
        let mut circuit = Circuit::new(0);
        circuit.append_gate(cnot(3, 1));
        assert_eq!(circuit.qubit_count(), 4);
    }

    #[test]
    fn test_adjacent_cancellation() {
        let mut circuit = Circuit::new(2);
        circuit.append_gate(h(0));
        circuit.append_gate(h(0));
        circuit.append_gate(cnot(0, 1));
        assert_eq!(circuit.len(), 1);
        assert!(circuit.gates().next().unwrap().is_cnot());
    }

    #[test]
    fn test_cancellation_across_commuting_gate() {
        // H(0), H(1), H(0): the second H(0) commutes past H(1) and
        // cancels against the first.
        let mut circuit = Circuit::new(2);
        circuit.append_gate(h(0));
        circuit.append_gate(h(1));
        circuit.append_gate(h(0));
        assert_eq!(circuit.len(), 1);
        assert_eq!(circuit.gates().next().unwrap().target(), q(1));
    }

    #[test]
    fn test_blocked_gate_does_not_cancel() {
        // CNOT(0,1) pins H(0): the later H(0) must stay after it.
        let mut circuit = Circuit::new(2);
        circuit.append_gate(h(0));
        circuit.append_gate(cnot(0, 1));
        circuit.append_gate(h(0));
        assert_eq!(circuit.len(), 3);
    }

    #[test]
    fn test_x_rekeys_later_control() {
        // Appending CNOT(0,1) after X(0) commutes it to the front as an
        // anti-controlled NOT (the X inverts the control value).
        let mut circuit = Circuit::new(2);
        circuit.append_gate(x(0));
        circuit.append_gate(cnot(0, 1));
        let list: Vec<&CircuitGate> = circuit.gates().collect();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].target(), q(1));
        assert!(list[0].payloads().contains_key(&0));
        assert_eq!(list[1].target(), q(0));
    }

    #[test]
    fn test_cascading_removal() {
        // The trailing X(0) pair cancels through the canonical list even
        // though an anti-CNOT sits between them and the front X.
        let mut circuit = Circuit::new(2);
        circuit.append_gate(x(0));
        circuit.append_gate(cnot(0, 1));
        circuit.append_gate(x(0));
        circuit.append_gate(x(0));
        let list: Vec<&CircuitGate> = circuit.gates().collect();
        assert_eq!(list.len(), 2);
        // Rekeyed CNOT first, then the surviving X(0).
        assert!(list[0].payloads().contains_key(&0));
        assert!(list[1].payloads()[&0].approx_eq(&Matrix2::PAULI_X));
    }

    #[test]
    fn test_canonical_form_no_adjacent_combinables() {
        let mut circuit = Circuit::new(3);
        let gates = [h(0), x(1), h(0), cnot(0, 1), x(2), cnot(1, 2), h(2), h(2)];
        for g in gates {
            circuit.append_gate(g);
        }
        let list: Vec<&CircuitGate> = circuit.gates().collect();
        for pair in list.windows(2) {
            assert!(!pair[0].can_combine(pair[1]));
        }
    }

    #[test]
    fn test_swap_emits_triplet_and_collapses() {
        let mut circuit = Circuit::new(2);
        circuit.swap(q(0), q(1));
        assert_eq!(circuit.len(), 3);
        let collapsed = circuit.collapse_triplets();
        assert_eq!(collapsed.len(), 1);
        assert!(collapsed[0].is_swap());
    }

    #[test]
    fn test_double_swap_cancels() {
        let mut circuit = Circuit::new(2);
        circuit.swap(q(0), q(1));
        circuit.swap(q(1), q(0));
        assert!(circuit.is_empty());
    }

    #[test]
    fn test_from_parts_covers_gates() {
        let circuit = Circuit::from_parts(0, [cnot(2, 0)]);
        assert_eq!(circuit.qubit_count(), 3);
        assert_eq!(circuit.len(), 1);
    }
}
