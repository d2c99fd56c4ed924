//! Lowering arbitrary 2x2 payloads onto the tableau's Clifford gate set
//!
//! Diagonal payloads lower through the phase family, anti-diagonal ones
//! through X plus a phase, and balanced matrices (all entries of equal
//! magnitude 1/sqrt 2) decompose as `g * diag(1,q) * H * diag(1,p)` with
//! `p, q` fourth roots of unity. Controlled payloads must be diagonal or
//! anti-diagonal; anything else is a domain error, except when a
//! separable control or target lets the gate reduce to a single-qubit
//! one.

use crate::state::StabilizerState;
use smallvec::SmallVec;
use stabq_core::numeric::{approx_eq, is_unit, Complex, Real, I_C, ONE_C};
use stabq_core::{Matrix2, MatrixKind, QuantumError, QubitId, Result, Simulator};

const SQRT2: Real = std::f64::consts::SQRT_2 as Real;

fn is_clifford_phase(c: Complex) -> bool {
    approx_eq(c, ONE_C) || approx_eq(c, I_C) || approx_eq(c, -ONE_C) || approx_eq(c, -I_C)
}

impl StabilizerState {
    /// Apply `diag(top, bottom)` on `t`
    ///
    /// `bottom/top` must be a fourth root of unity; the common factor
    /// `top` is global and folds into the phase offset.
    pub fn phase(&mut self, top: Complex, bottom: Complex, t: usize) -> Result<()> {
        self.check_qubit(t)?;
        if !is_unit(top) || !is_unit(bottom) {
            return Err(QuantumError::UnsupportedMatrix(
                "phase entries must have unit modulus",
            ));
        }
        let ratio = bottom / top;
        if approx_eq(ratio, ONE_C) {
            return self.apply_global_phase(top);
        }
        if approx_eq(ratio, I_C) {
            self.s(t)?;
        } else if approx_eq(ratio, -ONE_C) {
            self.z_aware(t)?;
        } else if approx_eq(ratio, -I_C) {
            self.sdg(t)?;
        } else {
            return Err(QuantumError::UnsupportedMatrix(
                "diagonal ratio is not a Clifford phase",
            ));
        }
        self.apply_global_phase(top)
    }

    /// Apply the anti-diagonal `[[0, top_right], [bottom_left, 0]]` on `t`
    pub fn invert(&mut self, top_right: Complex, bottom_left: Complex, t: usize) -> Result<()> {
        // X times diag(bottom_left, top_right).
        self.phase(bottom_left, top_right, t)?;
        self.x(t)
    }

    /// Controlled `diag(top, bottom)`; at most one control on a
    /// non-separable register
    pub fn mc_phase(
        &mut self,
        controls: &[usize],
        top: Complex,
        bottom: Complex,
        t: usize,
    ) -> Result<()> {
        self.check_controls(controls, t)?;
        if controls.is_empty() {
            return self.phase(top, bottom, t);
        }
        if !is_unit(top) || !is_unit(bottom) {
            return Err(QuantumError::UnsupportedMatrix(
                "phase entries must have unit modulus",
            ));
        }
        if approx_eq(top, ONE_C) && approx_eq(bottom, ONE_C) {
            return Ok(());
        }
        if controls.len() > 1 {
            return Err(QuantumError::UnsupportedMatrix(
                "stabilizer controlled phases take a single control",
            ));
        }
        let c = controls[0];

        if self.is_separable_z(c)? {
            // The control is classical: the gate collapses to a
            // single-qubit phase or to nothing.
            if self.force_m(c, false, false, false)? {
                return self.phase(top, bottom, t);
            }
            return Ok(());
        }
        if self.is_separable_z(t)? {
            // The target is classical: the phase lands on the control.
            let one = self.force_m(t, false, false, false)?;
            let factor = if one { bottom } else { top };
            return self.phase(ONE_C, factor, c);
        }

        // diag(1,1,top,bottom) = [diag(1, top) on c] * [controlled diag(1, ratio)]
        let ratio = bottom / top;
        if approx_eq(ratio, ONE_C) {
            return self.phase(ONE_C, top, c);
        }
        if approx_eq(ratio, -ONE_C) {
            if !is_clifford_phase(top) {
                return Err(QuantumError::UnsupportedMatrix(
                    "controlled phase factor is not Clifford",
                ));
            }
            self.phase(ONE_C, top, c)?;
            return self.cz(c, t);
        }
        Err(QuantumError::UnsupportedMatrix(
            "controlled phase ratio is not Clifford",
        ))
    }

    /// Anti-controlled `diag(top, bottom)`
    pub fn mac_phase(
        &mut self,
        controls: &[usize],
        top: Complex,
        bottom: Complex,
        t: usize,
    ) -> Result<()> {
        self.check_controls(controls, t)?;
        for &c in controls {
            self.x(c)?;
        }
        let result = self.mc_phase(controls, top, bottom, t);
        for &c in controls {
            self.x(c)?;
        }
        result
    }

    /// Controlled anti-diagonal `[[0, top_right], [bottom_left, 0]]`
    pub fn mc_invert(
        &mut self,
        controls: &[usize],
        top_right: Complex,
        bottom_left: Complex,
        t: usize,
    ) -> Result<()> {
        self.check_controls(controls, t)?;
        if controls.is_empty() {
            return self.invert(top_right, bottom_left, t);
        }
        if controls.len() > 1 {
            return Err(QuantumError::UnsupportedMatrix(
                "stabilizer controlled inverts take a single control",
            ));
        }
        let c = controls[0];

        if self.is_separable_z(c)? {
            if self.force_m(c, false, false, false)? {
                return self.invert(top_right, bottom_left, t);
            }
            return Ok(());
        }

        // c-(X * diag(bl, tr)) = CNOT * c-diag(bl, tr).
        self.mc_phase(controls, bottom_left, top_right, t)?;
        self.cnot(c, t)
    }

    /// Anti-controlled anti-diagonal
    pub fn mac_invert(
        &mut self,
        controls: &[usize],
        top_right: Complex,
        bottom_left: Complex,
        t: usize,
    ) -> Result<()> {
        self.check_controls(controls, t)?;
        for &c in controls {
            self.x(c)?;
        }
        let result = self.mc_invert(controls, top_right, bottom_left, t);
        for &c in controls {
            self.x(c)?;
        }
        result
    }

    /// Apply an arbitrary single-qubit Clifford matrix
    pub fn mtrx(&mut self, m: &Matrix2, t: usize) -> Result<()> {
        self.check_qubit(t)?;
        match m.kind() {
            MatrixKind::Phase => self.phase(m.0[0], m.0[3], t),
            MatrixKind::Invert => self.invert(m.0[1], m.0[2], t),
            MatrixKind::Dense => self.balanced_mtrx(m, t),
        }
    }

    /// Controlled single-qubit matrix; must be diagonal or anti-diagonal
    pub fn mc_mtrx(&mut self, controls: &[usize], m: &Matrix2, t: usize) -> Result<()> {
        match m.kind() {
            MatrixKind::Phase => self.mc_phase(controls, m.0[0], m.0[3], t),
            MatrixKind::Invert => self.mc_invert(controls, m.0[1], m.0[2], t),
            MatrixKind::Dense => Err(QuantumError::UnsupportedMatrix(
                "controlled matrix is neither diagonal nor anti-diagonal",
            )),
        }
    }

    /// Anti-controlled single-qubit matrix; must be diagonal or
    /// anti-diagonal
    pub fn mac_mtrx(&mut self, controls: &[usize], m: &Matrix2, t: usize) -> Result<()> {
        match m.kind() {
            MatrixKind::Phase => self.mac_phase(controls, m.0[0], m.0[3], t),
            MatrixKind::Invert => self.mac_invert(controls, m.0[1], m.0[2], t),
            MatrixKind::Dense => Err(QuantumError::UnsupportedMatrix(
                "controlled matrix is neither diagonal nor anti-diagonal",
            )),
        }
    }

    /// Balanced Clifford decomposition `g * diag(1,q) * H * diag(1,p)`
    fn balanced_mtrx(&mut self, m: &Matrix2, t: usize) -> Result<()> {
        let balanced = m
            .0
            .iter()
            .all(|e| (e.norm_sqr() - 0.5).abs() <= stabq_core::NORM_EPSILON);
        if !balanced {
            return Err(QuantumError::UnsupportedMatrix(
                "matrix is not Clifford on the stabilizer representation",
            ));
        }
        let g = m.0[0] * SQRT2;
        let p = m.0[1] * SQRT2 / g;
        let q = m.0[2] * SQRT2 / g;
        let expected_m11 = -(p * q) * g / SQRT2;
        if !is_clifford_phase(p) || !is_clifford_phase(q) || !approx_eq(m.0[3], expected_m11) {
            return Err(QuantumError::UnsupportedMatrix(
                "matrix is not Clifford on the stabilizer representation",
            ));
        }
        self.phase(ONE_C, p, t)?;
        self.h(t)?;
        self.phase(ONE_C, q, t)?;
        self.apply_global_phase(g)
    }

    fn check_controls(&self, controls: &[usize], t: usize) -> Result<()> {
        self.check_qubit(t)?;
        for (i, &c) in controls.iter().enumerate() {
            self.check_qubit(c)?;
            if c == t || controls[..i].contains(&c) {
                return Err(QuantumError::InvalidControl(c));
            }
        }
        Ok(())
    }
}

impl Simulator for StabilizerState {
    fn qubit_count(&self) -> usize {
        StabilizerState::qubit_count(self)
    }

    fn allocate(&mut self, length: usize) -> Result<()> {
        StabilizerState::allocate(self, length)
    }

    fn mtrx(&mut self, m: &Matrix2, target: QubitId) -> Result<()> {
        StabilizerState::mtrx(self, m, target.index())
    }

    fn mc_mtrx(&mut self, controls: &[QubitId], m: &Matrix2, target: QubitId) -> Result<()> {
        let controls: SmallVec<[usize; 2]> = controls.iter().map(|c| c.index()).collect();
        StabilizerState::mc_mtrx(self, &controls, m, target.index())
    }

    fn mac_mtrx(&mut self, controls: &[QubitId], m: &Matrix2, target: QubitId) -> Result<()> {
        let controls: SmallVec<[usize; 2]> = controls.iter().map(|c| c.index()).collect();
        StabilizerState::mac_mtrx(self, &controls, m, target.index())
    }

    fn swap(&mut self, a: QubitId, b: QubitId) -> Result<()> {
        StabilizerState::swap(self, a.index(), b.index())
    }

    fn x(&mut self, q: QubitId) -> Result<()> {
        StabilizerState::x(self, q.index())
    }
}
