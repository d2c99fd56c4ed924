//! Register composition, decomposition and separability oracles
//!
//! `compose` splices another register's qubits into this one; `decompose`
//! and `dispose` remove a contiguous qubit range, which is only possible
//! when Gaussian elimination leaves no stabilizer generator straddling
//! the range boundary.

use crate::rows::Rows;
use crate::state::StabilizerState;
use stabq_core::numeric::ONE_C;
use stabq_core::{QuantumError, Result};

/// Which Pauli basis, if any, a qubit is an eigenstate of
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Separability {
    /// Entangled or in no Pauli eigenstate
    None = 0,
    Z = 1,
    X = 2,
    Y = 3,
}

impl Rows {
    /// Splice `other`'s qubits in at column `start`
    pub(crate) fn compose(&mut self, other: &Rows, start: usize) {
        let n = self.n;
        let m = other.n;
        let nn = n + m;

        let widen_self = |row: &[bool]| {
            let mut v = Vec::with_capacity(nn);
            v.extend_from_slice(&row[..start]);
            v.resize(start + m, false);
            v.extend_from_slice(&row[start..]);
            v
        };
        let widen_other = |row: &[bool]| {
            let mut v = vec![false; nn];
            v[start..start + m].copy_from_slice(row);
            v
        };

        let count = 2 * nn + 1;
        let mut x = Vec::with_capacity(count);
        let mut z = Vec::with_capacity(count);
        let mut r = Vec::with_capacity(count);

        // Destabilizers, then stabilizers, each with other's rows spliced
        // at the insertion point.
        for block in 0..2 {
            for j in 0..nn {
                let (src, widen): (&Rows, bool) = if j < start {
                    (&*self, true)
                } else if j < start + m {
                    (other, false)
                } else {
                    (&*self, true)
                };
                let (row, offset) = if widen {
                    let orig = if j < start { j } else { j - m };
                    (orig, block * n)
                } else {
                    (j - start, block * m)
                };
                let i = row + offset;
                if widen {
                    x.push(widen_self(&src.x[i]));
                    z.push(widen_self(&src.z[i]));
                } else {
                    x.push(widen_other(&src.x[i]));
                    z.push(widen_other(&src.z[i]));
                }
                r.push(src.r[i]);
            }
        }
        x.push(vec![false; nn]);
        z.push(vec![false; nn]);
        r.push(0);

        self.n = nn;
        self.x = x;
        self.z = z;
        self.r = r;
        self.phase_offset *= other.phase_offset;
        self.is_unitarity_broken |= other.is_unitarity_broken;
    }

    /// After Gaussian elimination, can columns `[start, start+length)`
    /// split off? True iff no stabilizer generator has support both
    /// inside and outside the window.
    pub(crate) fn can_decompose(&mut self, start: usize, length: usize) -> bool {
        if length == self.n {
            return true;
        }
        self.gaussian();
        let end = start + length;
        for i in self.n..2 * self.n {
            let inside = (start..end).any(|j| self.x[i][j] || self.z[i][j]);
            let outside = (0..start)
                .chain(end..self.n)
                .any(|j| self.x[i][j] || self.z[i][j]);
            if inside && outside {
                return false;
            }
        }
        true
    }

    /// Remove the qubit window, optionally copying it into a fresh tableau
    pub(crate) fn decompose_dispose(
        &mut self,
        start: usize,
        length: usize,
        want_dest: bool,
    ) -> Result<Option<Rows>> {
        let n = self.n;
        let end = start + length;
        if !self.can_decompose(start, length) {
            return Err(QuantumError::DecomposeFailed { start, end });
        }

        let inside: Vec<usize> = (n..2 * n)
            .filter(|&i| (start..end).any(|j| self.x[i][j] || self.z[i][j]))
            .collect();
        if inside.len() != length {
            return Err(QuantumError::DecomposeFailed { start, end });
        }

        let dest = want_dest.then(|| {
            let mut dest = Rows::new(length);
            for (row, &i) in inside.iter().enumerate() {
                let partner = i - n;
                for (col, j) in (start..end).enumerate() {
                    dest.x[row][col] = self.x[partner][j];
                    dest.z[row][col] = self.z[partner][j];
                    dest.x[length + row][col] = self.x[i][j];
                    dest.z[length + row][col] = self.z[i][j];
                }
                dest.r[row] = self.r[partner];
                dest.r[length + row] = self.r[i];
            }
            dest.phase_offset = ONE_C;
            dest
        });

        let mut keep = vec![true; 2 * n];
        for &i in &inside {
            keep[i] = false;
            keep[i - n] = false;
        }

        let nn = n - length;
        let count = 2 * nn + 1;
        let mut x = Vec::with_capacity(count);
        let mut z = Vec::with_capacity(count);
        let mut r = Vec::with_capacity(count);
        let narrow = |row: &[bool]| {
            let mut v = Vec::with_capacity(nn);
            v.extend_from_slice(&row[..start]);
            v.extend_from_slice(&row[end..]);
            v
        };
        for i in 0..2 * n {
            if keep[i] {
                x.push(narrow(&self.x[i]));
                z.push(narrow(&self.z[i]));
                r.push(self.r[i]);
            }
        }
        x.push(vec![false; nn]);
        z.push(vec![false; nn]);
        r.push(0);

        self.n = nn;
        self.x = x;
        self.z = z;
        self.r = r;
        Ok(dest)
    }
}

impl StabilizerState {
    /// Insert `other`'s qubits at position `start`
    ///
    /// The global phase offsets multiply; `other` is unchanged.
    pub fn compose(&mut self, other: &StabilizerState, start: usize) -> Result<()> {
        let n = self.qubit_count();
        if start > n {
            return Err(QuantumError::invalid_qubit(start, n));
        }
        self.finish()?;
        other.finish()?;
        let other_rows = other.rows_handle().lock().clone();
        self.rows_handle().lock().compose(&other_rows, start);
        Ok(())
    }

    /// Append `length` fresh qubits in |0...0>
    pub fn allocate(&mut self, length: usize) -> Result<()> {
        if length == 0 {
            return Ok(());
        }
        self.finish()?;
        let mut rows = self.rows_handle().lock();
        let n = rows.n;
        rows.compose(&Rows::new(length), n);
        Ok(())
    }

    /// Can the qubit window split off as an unentangled factor?
    pub fn can_decompose_dispose(&self, start: usize, length: usize) -> Result<bool> {
        self.check_range(start, length)?;
        self.finish()?;
        Ok(self.rows_handle().lock().can_decompose(start, length))
    }

    /// Split the qubit window off into its own register
    pub fn decompose(&mut self, start: usize, length: usize) -> Result<StabilizerState> {
        self.check_range(start, length)?;
        self.finish()?;
        let dest = self
            .rows_handle()
            .lock()
            .decompose_dispose(start, length, true)?
            .expect("requested destination rows");
        let (rand_global_phase, repair_policy) = self.inherit_options();
        Ok(StabilizerState::from_rows(
            dest,
            rand_global_phase,
            repair_policy,
        ))
    }

    /// Discard the qubit window
    pub fn dispose(&mut self, start: usize, length: usize) -> Result<()> {
        self.check_range(start, length)?;
        self.finish()?;
        self.rows_handle()
            .lock()
            .decompose_dispose(start, length, false)?;
        Ok(())
    }

    /// Is qubit `q` unentangled with the rest of the register?
    pub fn try_separate(&self, q: usize) -> Result<bool> {
        self.can_decompose_dispose(q, 1)
    }

    /// Are qubits `q1` and `q2` jointly unentangled with the rest?
    ///
    /// The pair is swapped into positions 0 and 1, tested, and swapped
    /// back.
    pub fn try_separate_pair(&mut self, q1: usize, q2: usize) -> Result<bool> {
        self.check_qubit(q1)?;
        self.check_qubit(q2)?;
        if q1 == q2 {
            return self.try_separate(q1);
        }
        // After the first swap the qubit originally at 0 sits at q1.
        let q2 = if q2 == 0 { q1 } else { q2 };
        self.swap(q1, 0)?;
        self.swap(q2, 1)?;
        let separable = self.can_decompose_dispose(0, 2)?;
        self.swap(q2, 1)?;
        self.swap(q1, 0)?;
        Ok(separable)
    }

    /// True iff qubit `t` is a Z-basis eigenstate: no stabilizer has X
    /// support there
    pub fn is_separable_z(&self, t: usize) -> Result<bool> {
        self.check_qubit(t)?;
        self.finish()?;
        Ok(self.rows_handle().lock().is_separable_z(t))
    }

    /// True iff qubit `t` is an X-basis eigenstate
    pub fn is_separable_x(&self, t: usize) -> Result<bool> {
        self.check_qubit(t)?;
        self.finish()?;
        let mut rows = self.rows_handle().lock();
        rows.h_kernel(t);
        let separable = rows.is_separable_z(t);
        rows.h_kernel(t);
        Ok(separable)
    }

    /// True iff qubit `t` is a Y-basis eigenstate
    pub fn is_separable_y(&self, t: usize) -> Result<bool> {
        self.check_qubit(t)?;
        self.finish()?;
        let mut rows = self.rows_handle().lock();
        // S-dagger then H maps the Y basis onto the Z basis.
        rows.sdg_kernel(t);
        rows.h_kernel(t);
        let separable = rows.is_separable_z(t);
        rows.h_kernel(t);
        rows.s_kernel(t);
        Ok(separable)
    }

    /// Which Pauli basis, if any, qubit `t` is an eigenstate of
    pub fn is_separable(&self, t: usize) -> Result<Separability> {
        if self.is_separable_z(t)? {
            Ok(Separability::Z)
        } else if self.is_separable_x(t)? {
            Ok(Separability::X)
        } else if self.is_separable_y(t)? {
            Ok(Separability::Y)
        } else {
            Ok(Separability::None)
        }
    }

    fn check_range(&self, start: usize, length: usize) -> Result<()> {
        let n = self.qubit_count();
        if start + length > n {
            return Err(QuantumError::invalid_qubit(start + length, n + 1));
        }
        Ok(())
    }
}

impl Separability {
    /// The numeric encoding: 0 none, 1 Z, 2 X, 3 Y
    pub fn code(self) -> u8 {
        self as u8
    }
}
