//! The stabilizer register: public gate set, measurement and amplitude
//! queries
//!
//! Mutations are serialized through a per-register dispatch queue so
//! concurrent callers observe a totally ordered mutation sequence; every
//! read drains the queue first. When `rand_global_phase` is off, the
//! register additionally maintains a unit-modulus `phase_offset` that
//! multiplies every extracted amplitude, tracking the global phase the
//! tableau itself cannot represent.

use crate::rows::Rows;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stabq_core::numeric::{is_norm_zero, Complex, Real, I_C, ONE_C, ZERO_C};
use stabq_core::{perm_count, DispatchQueue, Permutation, QuantumError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One basis state and its amplitude
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmplitudeEntry {
    pub permutation: Permutation,
    pub amplitude: Complex,
}

/// What to do when a phase-aware gate finds no permutation with support
/// in both the pre and post states
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PhaseRepairPolicy {
    /// Leave `phase_offset` untouched
    #[default]
    Skip,
    /// Surface `PhaseRepairFailed`
    Error,
}

/// Aaronson-Gottesman stabilizer tableau with a global phase offset
///
/// # Example
/// ```
/// use stabq_tableau::StabilizerState;
///
/// let mut state = StabilizerState::new(2);
/// state.h(0).unwrap();
/// state.cnot(0, 1).unwrap();
/// assert_eq!(state.prob(0).unwrap(), 0.5);
/// assert_eq!(state.perm_count().unwrap(), 2);
/// ```
pub struct StabilizerState {
    rows: Arc<Mutex<Rows>>,
    queue: DispatchQueue,
    rng: StdRng,
    rand_global_phase: bool,
    repair_policy: PhaseRepairPolicy,
}

impl StabilizerState {
    /// Create an `n`-qubit register in |0...0>
    pub fn new(n: usize) -> Self {
        Self::with_permutation(n, 0)
    }

    /// Create an `n`-qubit register in the basis state `perm`
    pub fn with_permutation(n: usize, perm: Permutation) -> Self {
        let mut rows = Rows::new(n);
        rows.set_permutation(perm);
        Self {
            rows: Arc::new(Mutex::new(rows)),
            queue: DispatchQueue::new(),
            rng: StdRng::from_entropy(),
            rand_global_phase: true,
            repair_policy: PhaseRepairPolicy::default(),
        }
    }

    /// Number of qubits in the register
    pub fn qubit_count(&self) -> usize {
        self.rows.lock().n
    }

    /// Whether global phase is treated as unobservable (default true);
    /// turn off to track `phase_offset` through phase-aware gates
    pub fn set_rand_global_phase(&mut self, rand: bool) {
        self.rand_global_phase = rand;
    }

    /// Policy for unrepairable global phases; see [`PhaseRepairPolicy`]
    pub fn set_phase_repair_policy(&mut self, policy: PhaseRepairPolicy) {
        self.repair_policy = policy;
    }

    /// Reseed the register's RNG deterministically
    pub fn set_random_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// The tracked global phase factor
    pub fn phase_offset(&self) -> Result<Complex> {
        self.queue.finish()?;
        Ok(self.rows.lock().phase_offset)
    }

    /// Reset the tracked global phase to one
    pub fn reset_phase_offset(&mut self) -> Result<()> {
        self.queue.finish()?;
        self.rows.lock().phase_offset = ONE_C;
        Ok(())
    }

    /// True once a forced measurement or degenerate normalization broke
    /// unit norm; amplitude queries then report zero
    pub fn is_unitarity_broken(&self) -> Result<bool> {
        self.queue.finish()?;
        Ok(self.rows.lock().is_unitarity_broken)
    }

    /// Reset to the basis state `perm`, discarding pending work
    pub fn set_permutation(&mut self, perm: Permutation, phase: Option<Complex>) -> Result<()> {
        self.check_permutation(perm)?;
        self.queue.dump();
        self.queue.finish()?;
        let mut rows = self.rows.lock();
        rows.set_permutation(perm);
        if !self.rand_global_phase {
            rows.phase_offset = phase.unwrap_or(ONE_C);
        }
        Ok(())
    }

    /// Drop every qubit, leaving a zero-width register
    pub fn clear(&mut self) {
        self.queue.dump();
        let _ = self.queue.finish();
        self.rows.lock().clear();
    }

    /// Amplitudes cannot be written into a stabilizer register
    pub fn set_amplitude(&mut self, _perm: Permutation, _amp: Complex) -> Result<()> {
        Err(QuantumError::SetAmplitudeUnsupported)
    }

    pub(crate) fn check_qubit(&self, q: usize) -> Result<()> {
        let n = self.qubit_count();
        if q >= n {
            return Err(QuantumError::invalid_qubit(q, n));
        }
        Ok(())
    }

    fn check_permutation(&self, perm: Permutation) -> Result<()> {
        let n = self.qubit_count();
        if n < 64 && perm >= perm_count(n) {
            return Err(QuantumError::InvalidPermutation {
                permutation: perm,
                num_qubits: n,
            });
        }
        Ok(())
    }

    pub(crate) fn dispatch_rows(&self, f: impl FnOnce(&mut Rows) + Send + 'static) {
        let rows = Arc::clone(&self.rows);
        self.queue.dispatch(move || f(&mut rows.lock()));
    }

    pub(crate) fn finish(&self) -> Result<()> {
        self.queue.finish()
    }

    pub(crate) fn rows_handle(&self) -> &Arc<Mutex<Rows>> {
        &self.rows
    }

    pub(crate) fn inherit_options(&self) -> (bool, PhaseRepairPolicy) {
        (self.rand_global_phase, self.repair_policy)
    }

    pub(crate) fn from_rows(
        rows: Rows,
        rand_global_phase: bool,
        repair_policy: PhaseRepairPolicy,
    ) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
            queue: DispatchQueue::new(),
            rng: StdRng::from_entropy(),
            rand_global_phase,
            repair_policy,
        }
    }

    // ----- gates ---------------------------------------------------------

    /// Hadamard on `t`
    pub fn h(&mut self, t: usize) -> Result<()> {
        self.check_qubit(t)?;
        self.dispatch_rows(move |rows| rows.h_kernel(t));
        Ok(())
    }

    /// Pauli X on `t`
    pub fn x(&mut self, t: usize) -> Result<()> {
        self.check_qubit(t)?;
        self.dispatch_rows(move |rows| rows.x_kernel(t));
        Ok(())
    }

    /// Pauli Y on `t`
    pub fn y(&mut self, t: usize) -> Result<()> {
        self.check_qubit(t)?;
        self.dispatch_rows(move |rows| rows.y_kernel(t));
        Ok(())
    }

    /// Pauli Z on `t`
    pub fn z(&mut self, t: usize) -> Result<()> {
        self.check_qubit(t)?;
        self.dispatch_rows(move |rows| rows.z_kernel(t));
        Ok(())
    }

    /// Phase gate S on `t` (|1> gains a factor i)
    pub fn s(&mut self, t: usize) -> Result<()> {
        self.check_qubit(t)?;
        self.apply_phase_aware(t, I_C, Rows::s_kernel)
    }

    /// Inverse phase gate S-dagger on `t`
    pub fn sdg(&mut self, t: usize) -> Result<()> {
        self.check_qubit(t)?;
        self.apply_phase_aware(t, -I_C, Rows::sdg_kernel)
    }

    /// Z on `t` with global-phase tracking; used by the diagonal lowering
    pub(crate) fn z_aware(&mut self, t: usize) -> Result<()> {
        self.check_qubit(t)?;
        self.apply_phase_aware(t, -ONE_C, Rows::z_kernel)
    }

    /// CNOT with control `c` and target `t`
    pub fn cnot(&mut self, c: usize, t: usize) -> Result<()> {
        self.check_pair(c, t)?;
        self.dispatch_rows(move |rows| rows.cnot_kernel(c, t));
        Ok(())
    }

    /// Controlled Y, derived as `S_t CNOT S^dag_t`
    pub fn cy(&mut self, c: usize, t: usize) -> Result<()> {
        self.check_pair(c, t)?;
        self.sdg(t)?;
        self.cnot(c, t)?;
        self.s(t)
    }

    /// Controlled Z, derived through the phase-aware S family so the
    /// global phase flows through on eigenstates
    pub fn cz(&mut self, c: usize, t: usize) -> Result<()> {
        self.check_pair(c, t)?;
        self.cnot(c, t)?;
        self.sdg(t)?;
        self.cnot(c, t)?;
        self.s(t)?;
        self.s(c)
    }

    /// CNOT conjugated by X on the control
    pub fn anti_cnot(&mut self, c: usize, t: usize) -> Result<()> {
        self.check_pair(c, t)?;
        self.x(c)?;
        self.cnot(c, t)?;
        self.x(c)
    }

    /// CY conjugated by X on the control
    pub fn anti_cy(&mut self, c: usize, t: usize) -> Result<()> {
        self.check_pair(c, t)?;
        self.x(c)?;
        self.cy(c, t)?;
        self.x(c)
    }

    /// CZ conjugated by X on the control
    pub fn anti_cz(&mut self, c: usize, t: usize) -> Result<()> {
        self.check_pair(c, t)?;
        self.x(c)?;
        self.cz(c, t)?;
        self.x(c)
    }

    /// Exchange qubits `a` and `b`
    pub fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        self.check_qubit(a)?;
        self.check_qubit(b)?;
        if a == b {
            return Ok(());
        }
        self.dispatch_rows(move |rows| rows.swap_kernel(a, b));
        Ok(())
    }

    /// Swap with a factor i on |01> and |10>
    pub fn iswap(&mut self, a: usize, b: usize) -> Result<()> {
        self.check_pair(a, b)?;
        self.s(a)?;
        self.s(b)?;
        self.cz(a, b)?;
        self.swap(a, b)
    }

    /// Inverse of [`iswap`](Self::iswap): factor -i on |01> and |10>
    pub fn iiswap(&mut self, a: usize, b: usize) -> Result<()> {
        self.check_pair(a, b)?;
        self.swap(a, b)?;
        self.cz(a, b)?;
        self.sdg(a)?;
        self.sdg(b)
    }

    fn check_pair(&self, a: usize, b: usize) -> Result<()> {
        self.check_qubit(a)?;
        self.check_qubit(b)?;
        if a == b {
            return Err(QuantumError::InvalidControl(a));
        }
        Ok(())
    }

    /// Multiply a factor into the tracked global phase
    pub(crate) fn apply_global_phase(&mut self, factor: Complex) -> Result<()> {
        if self.rand_global_phase || is_norm_zero(factor - ONE_C) {
            return Ok(());
        }
        self.queue.finish()?;
        self.rows.lock().phase_offset *= factor;
        Ok(())
    }

    /// Apply a diagonal `diag(1, eigenvalue)` kernel with global-phase
    /// maintenance
    ///
    /// On a Z-eigenstate target the tableau does not move, so the acting
    /// eigenvalue is folded straight into `phase_offset`. Otherwise the
    /// pre state is compared against the post state on the first shared
    /// permutation with the target bit clear, where the gate acts
    /// trivially, and the extraction-phase jump is repaired.
    fn apply_phase_aware(
        &mut self,
        t: usize,
        eigenvalue: Complex,
        kernel: fn(&mut Rows, usize),
    ) -> Result<()> {
        if self.rand_global_phase {
            self.dispatch_rows(move |rows| kernel(rows, t));
            return Ok(());
        }

        self.queue.finish()?;
        let mut rows = self.rows.lock();

        if rows.is_separable_z(t) {
            let one = rows.z_outcome(t);
            kernel(&mut rows, t);
            if one {
                rows.phase_offset *= eigenvalue;
            }
            return Ok(());
        }

        let pre = rows.state_map();
        kernel(&mut rows, t);
        let post = rows.state_map();

        let t_mask = 1u64 << t;
        for (&p, &old) in pre.iter() {
            if p & t_mask != 0 {
                continue;
            }
            let Some(&new) = post.get(&p) else { continue };
            if is_norm_zero(old) || is_norm_zero(new) {
                continue;
            }
            rows.phase_offset *= (old * new.norm()) / (new * old.norm());
            return Ok(());
        }

        match self.repair_policy {
            PhaseRepairPolicy::Skip => Ok(()),
            PhaseRepairPolicy::Error => Err(QuantumError::PhaseRepairFailed),
        }
    }

    // ----- measurement ---------------------------------------------------

    /// Measure qubit `t` in the Z basis
    pub fn m(&mut self, t: usize) -> Result<bool> {
        self.force_m(t, false, false, true)
    }

    /// Measure qubit `t`, optionally forcing the outcome or leaving the
    /// register uncollapsed
    ///
    /// When a stabilizer anticommutes with `Z_t` the outcome is random
    /// (or `result` when `do_force`); `do_apply` controls whether the
    /// register collapses. Otherwise the outcome is deterministic; forcing
    /// its negation latches `is_unitarity_broken` and the register stops
    /// reporting amplitudes.
    pub fn force_m(&mut self, t: usize, result: bool, do_force: bool, do_apply: bool) -> Result<bool> {
        self.check_qubit(t)?;
        self.queue.finish()?;

        let mut rows = self.rows.lock();
        if let Some(p) = rows.anticommuting_stabilizer(t) {
            let outcome = if do_force { result } else { self.rng.gen() };
            if do_apply {
                rows.collapse(p, t, outcome);
            }
            Ok(outcome)
        } else {
            let deterministic = rows.z_outcome(t);
            if do_force && result != deterministic {
                rows.is_unitarity_broken = true;
                return Ok(result);
            }
            Ok(deterministic)
        }
    }

    /// Probability that qubit `q` measures |1>: exactly 0, 1/2 or 1
    pub fn prob(&self, q: usize) -> Result<Real> {
        self.check_qubit(q)?;
        self.queue.finish()?;
        let mut rows = self.rows.lock();
        if rows.is_separable_z(q) {
            Ok(if rows.z_outcome(q) { 1.0 } else { 0.0 })
        } else {
            Ok(0.5)
        }
    }

    // ----- amplitude queries ---------------------------------------------

    /// `log2` of the number of basis states with nonzero amplitude
    pub fn gaussian(&self) -> Result<usize> {
        self.queue.finish()?;
        Ok(self.rows.lock().gaussian())
    }

    /// Number of basis states with nonzero amplitude, `2^gaussian()`
    pub fn perm_count(&self) -> Result<u64> {
        Ok(1u64 << self.gaussian()?)
    }

    /// Amplitude of one basis state
    pub fn get_amplitude(&self, perm: Permutation) -> Result<Complex> {
        self.check_permutation(perm)?;
        self.queue.finish()?;
        Ok(self.rows.lock().amplitude(perm))
    }

    /// Amplitudes of several basis states, in one enumeration pass
    pub fn get_amplitudes(&self, perms: &[Permutation]) -> Result<Vec<Complex>> {
        for &p in perms {
            self.check_permutation(p)?;
        }
        self.queue.finish()?;
        let map = self.rows.lock().state_map();
        Ok(perms
            .iter()
            .map(|p| map.get(p).copied().unwrap_or(ZERO_C))
            .collect())
    }

    /// The first enumerated basis state with nonzero amplitude
    pub fn get_any_amplitude(&self) -> Result<AmplitudeEntry> {
        self.queue.finish()?;
        let mut entry = AmplitudeEntry {
            permutation: 0,
            amplitude: ZERO_C,
        };
        self.rows.lock().enumerate_basis(|p, a| {
            entry = AmplitudeEntry {
                permutation: p,
                amplitude: a,
            };
            false
        });
        Ok(entry)
    }

    /// The first enumerated nonzero entry whose bit `t` equals `m`
    pub fn get_qubit_amplitude(&self, t: usize, m: bool) -> Result<AmplitudeEntry> {
        self.check_qubit(t)?;
        self.queue.finish()?;
        let mut entry = AmplitudeEntry {
            permutation: 0,
            amplitude: ZERO_C,
        };
        let mask = 1u64 << t;
        self.rows.lock().enumerate_basis(|p, a| {
            if ((p & mask) != 0) == m {
                entry = AmplitudeEntry {
                    permutation: p,
                    amplitude: a,
                };
                false
            } else {
                true
            }
        });
        Ok(entry)
    }

    /// The sparse state: every basis state with nonzero amplitude
    pub fn get_quantum_state(&self) -> Result<BTreeMap<Permutation, Complex>> {
        self.queue.finish()?;
        Ok(self.rows.lock().state_map())
    }

    /// Write the dense state vector into `out` (length `2^n`)
    pub fn fill_state_vector(&self, out: &mut [Complex]) -> Result<()> {
        let n = self.qubit_count();
        let expected = perm_count(n) as usize;
        if out.len() != expected {
            return Err(QuantumError::PayloadCountMismatch {
                expected,
                actual: out.len(),
            });
        }
        out.fill(ZERO_C);
        self.queue.finish()?;
        self.rows.lock().enumerate_basis(|p, a| {
            out[p as usize] = a;
            true
        });
        Ok(())
    }

    // ----- comparison and normalization ----------------------------------

    /// Distance from `other`, ignoring global phase: `1 - |<self|other>|^2`
    pub fn sum_sqr_diff(&self, other: &StabilizerState) -> Result<Real> {
        self.queue.finish()?;
        other.queue.finish()?;
        let a = self.rows.lock().state_map();
        let b = other.rows.lock().state_map();
        let overlap: Complex = a
            .iter()
            .filter_map(|(p, amp)| b.get(p).map(|o| amp.conj() * *o))
            .sum();
        Ok((1.0 - overlap.norm_sqr()).max(0.0))
    }

    /// True when the two registers represent the same state up to global
    /// phase, within `tolerance`
    pub fn approx_compare(&self, other: &StabilizerState, tolerance: Real) -> Result<bool> {
        Ok(self.sum_sqr_diff(other)? <= tolerance)
    }

    /// Stabilizer states stay normalized; this only folds an explicit
    /// phase argument into `phase_offset`. A negligible requested norm
    /// latches `is_unitarity_broken`.
    pub fn normalize_state(&mut self, nrm: Option<Real>, phase_arg: Real) -> Result<()> {
        self.queue.finish()?;
        let mut rows = self.rows.lock();
        if let Some(nrm) = nrm {
            if nrm * nrm <= stabq_core::NORM_EPSILON {
                rows.is_unitarity_broken = true;
            }
        }
        if !self.rand_global_phase {
            rows.phase_offset *= Complex::from_polar(1.0, phase_arg);
        }
        Ok(())
    }
}

impl Clone for StabilizerState {
    fn clone(&self) -> Self {
        // finish() only fails from inside a dispatched op, which never clones
        let _ = self.queue.finish();
        let rows = self.rows.lock().clone();
        Self {
            rows: Arc::new(Mutex::new(rows)),
            queue: DispatchQueue::new(),
            rng: self.rng.clone(),
            rand_global_phase: self.rand_global_phase,
            repair_policy: self.repair_policy,
        }
    }
}

impl fmt::Debug for StabilizerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StabilizerState")
            .field("qubit_count", &self.qubit_count())
            .field("rand_global_phase", &self.rand_global_phase)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stabq_core::numeric::{approx_eq, SQRT2_INV};

    fn amp(re: Real, im: Real) -> Complex {
        Complex::new(re, im)
    }

    #[test]
    fn test_bell_pair_amplitudes() {
        let mut state = StabilizerState::new(2);
        state.h(0).unwrap();
        state.cnot(0, 1).unwrap();
        let expected = amp(SQRT2_INV, 0.0);
        assert!(approx_eq(state.get_amplitude(0).unwrap(), expected));
        assert!(approx_eq(state.get_amplitude(3).unwrap(), expected));
        assert!(approx_eq(state.get_amplitude(1).unwrap(), ZERO_C));
        assert!(approx_eq(state.get_amplitude(2).unwrap(), ZERO_C));
        assert_eq!(state.prob(0).unwrap(), 0.5);
        assert_eq!(state.prob(1).unwrap(), 0.5);
    }

    #[test]
    fn test_gate_involutions_preserve_phase() {
        let mut state = StabilizerState::new(2);
        state.set_rand_global_phase(false);
        state.h(0).unwrap();
        state.cnot(0, 1).unwrap();

        let reference = state.clone();
        for _ in 0..2 {
            state.h(0).unwrap();
        }
        for _ in 0..2 {
            state.x(1).unwrap();
        }
        for _ in 0..2 {
            state.y(0).unwrap();
        }
        for _ in 0..2 {
            state.z(1).unwrap();
        }
        for _ in 0..2 {
            state.cnot(0, 1).unwrap();
        }
        for _ in 0..2 {
            state.swap(0, 1).unwrap();
        }
        assert!(state.approx_compare(&reference, 1e-9).unwrap());
        assert!(approx_eq(state.phase_offset().unwrap(), ONE_C));
    }

    #[test]
    fn test_s_fourth_power_phase() {
        // On |1>, each S contributes i; S^4 returns the phase to one.
        let mut state = StabilizerState::new(1);
        state.set_rand_global_phase(false);
        state.x(0).unwrap();
        state.s(0).unwrap();
        assert!(approx_eq(state.phase_offset().unwrap(), I_C));
        for _ in 0..3 {
            state.s(0).unwrap();
        }
        assert!(approx_eq(state.phase_offset().unwrap(), ONE_C));
        // And on a superposition S^4 also restores the state exactly.
        let mut plus = StabilizerState::new(1);
        plus.set_rand_global_phase(false);
        plus.h(0).unwrap();
        let reference = plus.clone();
        for _ in 0..4 {
            plus.s(0).unwrap();
        }
        assert!(plus.approx_compare(&reference, 1e-9).unwrap());
        assert!(approx_eq(plus.phase_offset().unwrap(), ONE_C));
    }

    #[test]
    fn test_cz_phase_on_eleven() {
        let mut state = StabilizerState::new(2);
        state.set_rand_global_phase(false);
        state.x(0).unwrap();
        state.x(1).unwrap();
        state.cz(0, 1).unwrap();
        assert!(approx_eq(state.phase_offset().unwrap(), -ONE_C));
        assert!(approx_eq(state.get_amplitude(3).unwrap(), -ONE_C));
    }

    #[test]
    fn test_cy_matches_matrix_on_basis() {
        // CY|11> = -i|10>
        let mut state = StabilizerState::new(2);
        state.set_rand_global_phase(false);
        state.x(0).unwrap();
        state.x(1).unwrap();
        state.cy(0, 1).unwrap();
        let entry = state.get_any_amplitude().unwrap();
        assert_eq!(entry.permutation, 0b01);
        assert!(approx_eq(entry.amplitude, amp(0.0, -1.0)));
    }

    #[test]
    fn test_iswap_phases() {
        // ISwap|01> = i|10>
        let mut state = StabilizerState::new(2);
        state.set_rand_global_phase(false);
        state.x(0).unwrap();
        state.iswap(0, 1).unwrap();
        let entry = state.get_any_amplitude().unwrap();
        assert_eq!(entry.permutation, 0b10);
        assert!(approx_eq(entry.amplitude, I_C));

        // IISwap undoes it, phase included.
        state.iiswap(0, 1).unwrap();
        let entry = state.get_any_amplitude().unwrap();
        assert_eq!(entry.permutation, 0b01);
        assert!(approx_eq(entry.amplitude, ONE_C));
    }

    #[test]
    fn test_iswap_squared_is_zz() {
        // ISwap^2 = Z (x) Z: |11> keeps amplitude 1, |01> flips sign.
        let mut state = StabilizerState::new(2);
        state.set_rand_global_phase(false);
        state.x(0).unwrap();
        state.iswap(0, 1).unwrap();
        state.iswap(0, 1).unwrap();
        let entry = state.get_any_amplitude().unwrap();
        assert_eq!(entry.permutation, 0b01);
        assert!(approx_eq(entry.amplitude, -ONE_C));
    }

    #[test]
    fn test_deterministic_measurement() {
        let mut state = StabilizerState::new(2);
        state.x(0).unwrap();
        assert!(state.m(0).unwrap());
        assert!(!state.m(1).unwrap());
        assert_eq!(state.prob(0).unwrap(), 1.0);
    }

    #[test]
    fn test_random_measurement_collapses() {
        let mut state = StabilizerState::new(2);
        state.set_random_seed(7);
        state.h(0).unwrap();
        state.cnot(0, 1).unwrap();
        let outcome = state.m(0).unwrap();
        // Collapsed: both qubits now agree deterministically.
        assert_eq!(state.m(1).unwrap(), outcome);
        assert_eq!(state.prob(0).unwrap(), if outcome { 1.0 } else { 0.0 });
        assert_eq!(state.perm_count().unwrap(), 1);
    }

    #[test]
    fn test_forced_measurement() {
        let mut state = StabilizerState::new(1);
        state.h(0).unwrap();
        assert!(state.force_m(0, true, true, true).unwrap());
        assert_eq!(state.prob(0).unwrap(), 1.0);
    }

    #[test]
    fn test_forcing_impossible_outcome_breaks_unitarity() {
        let mut state = StabilizerState::new(1);
        // Deterministically |0>; force a 1.
        assert!(state.force_m(0, true, true, true).unwrap());
        assert!(state.is_unitarity_broken().unwrap());
        assert!(approx_eq(state.get_amplitude(0).unwrap(), ZERO_C));
        assert!(approx_eq(state.get_amplitude(1).unwrap(), ZERO_C));
    }

    #[test]
    fn test_measurement_without_apply_preserves_state() {
        let mut state = StabilizerState::new(1);
        state.h(0).unwrap();
        let _ = state.force_m(0, false, false, false).unwrap();
        assert_eq!(state.prob(0).unwrap(), 0.5);
    }

    #[test]
    fn test_ghz_structure() {
        let mut state = StabilizerState::new(3);
        state.h(0).unwrap();
        state.cnot(0, 1).unwrap();
        state.cnot(1, 2).unwrap();
        assert_eq!(state.gaussian().unwrap(), 1);
        assert_eq!(state.perm_count().unwrap(), 2);
        let map = state.get_quantum_state().unwrap();
        assert!(map.contains_key(&0));
        assert!(map.contains_key(&7));
    }

    #[test]
    fn test_get_qubit_amplitude() {
        let mut state = StabilizerState::new(2);
        state.h(0).unwrap();
        state.cnot(0, 1).unwrap();
        let zero = state.get_qubit_amplitude(1, false).unwrap();
        assert_eq!(zero.permutation, 0);
        let one = state.get_qubit_amplitude(1, true).unwrap();
        assert_eq!(one.permutation, 3);
    }

    #[test]
    fn test_amplitude_normalization_random_circuit() {
        let mut state = StabilizerState::new(4);
        state.set_random_seed(11);
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..64 {
            match rng.gen_range(0..5) {
                0 => state.h(rng.gen_range(0..4)).unwrap(),
                1 => state.s(rng.gen_range(0..4)).unwrap(),
                2 => state.x(rng.gen_range(0..4)).unwrap(),
                3 => {
                    let c = rng.gen_range(0..4);
                    let t = (c + rng.gen_range(1..4)) % 4;
                    state.cnot(c, t).unwrap();
                }
                _ => state.z(rng.gen_range(0..4)).unwrap(),
            }
        }
        let map = state.get_quantum_state().unwrap();
        let total: Real = map.values().map(|a| a.norm_sqr()).sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_set_amplitude_rejected() {
        let mut state = StabilizerState::new(1);
        let err = state.set_amplitude(0, ONE_C).unwrap_err();
        assert_eq!(err, QuantumError::SetAmplitudeUnsupported);
    }

    #[test]
    fn test_out_of_range_qubit() {
        let mut state = StabilizerState::new(2);
        assert!(matches!(
            state.h(2).unwrap_err(),
            QuantumError::InvalidQubit { .. }
        ));
        assert!(matches!(
            state.cnot(0, 0).unwrap_err(),
            QuantumError::InvalidControl(0)
        ));
    }

    #[test]
    fn test_normalize_state_latches_broken() {
        let mut state = StabilizerState::new(1);
        state.normalize_state(Some(0.0), 0.0).unwrap();
        assert!(state.is_unitarity_broken().unwrap());
    }
}
