//! Gaussian elimination and basis-state enumeration
//!
//! A stabilizer state assigns nonzero amplitude to exactly `2^g` basis
//! states, where `g` is the number of stabilizer generators with X
//! support after row reduction. Enumeration seeds the scratch row with a
//! Pauli `P` such that `P|0...0>` lies in the support, then walks the
//! remaining `2^g - 1` states in Gray-code order by multiplying scratch
//! with the leading generators. Every emitted amplitude carries the
//! register's global `phase_offset`.

use crate::rows::Rows;
use stabq_core::numeric::{i_pow, Complex, Real, ZERO_C};
use stabq_core::Permutation;
use std::collections::BTreeMap;

impl Rows {
    /// Row-reduce the stabilizer block; returns `g`, the log2 of the
    /// number of basis states with nonzero amplitude
    ///
    /// X-columns are eliminated first, then Z-columns, so generators with
    /// X support end up on top in quasi-upper-triangular form. Every row
    /// operation is mirrored onto the paired destabilizers to keep the
    /// symplectic pairing intact.
    pub(crate) fn gaussian(&mut self) -> usize {
        let n = self.n;
        if n == 0 {
            return 0;
        }

        let mut i = n;
        for j in 0..n {
            if let Some(k) = (i..2 * n).find(|&k| self.x[k][j]) {
                self.rowswap(i, k);
                self.rowswap(i - n, k - n);
                for k2 in (i + 1)..2 * n {
                    if self.x[k2][j] {
                        self.rowmult(k2, i);
                        self.rowmult(i - n, k2 - n);
                    }
                }
                i += 1;
            }
        }
        let g = i - n;

        for j in 0..n {
            if let Some(k) = (i..2 * n).find(|&k| self.z[k][j]) {
                self.rowswap(i, k);
                self.rowswap(i - n, k - n);
                for k2 in (i + 1)..2 * n {
                    if self.z[k2][j] {
                        self.rowmult(k2, i);
                        self.rowmult(i - n, k2 - n);
                    }
                }
                i += 1;
            }
        }
        g
    }

    /// Write into the scratch row a Pauli `P` with `P|0...0>` in the
    /// support of the state; requires `gaussian` to have just run
    pub(crate) fn seed(&mut self, g: usize) {
        let n = self.n;
        let scratch = self.scratch();
        self.x[scratch].fill(false);
        self.z[scratch].fill(false);
        self.r[scratch] = 0;

        let mut min = 0;
        for i in (n + g..2 * n).rev() {
            let mut f = self.r[i];
            for j in (0..n).rev() {
                if self.z[i][j] {
                    min = j;
                    if self.x[scratch][j] {
                        f = (f + 2) & 3;
                    }
                }
            }
            // Make the seed consistent with the i-th Z-only generator.
            if f == 2 {
                self.x[scratch][min] = !self.x[scratch][min];
            }
        }
    }

    /// Basis state and amplitude produced by applying the scratch Pauli
    /// to |0...0>, scaled by `nrm`
    fn basis_amp(&self, nrm: Real) -> (Permutation, Complex) {
        let scratch = self.scratch();
        let mut e = self.r[scratch];
        let mut perm: Permutation = 0;
        for j in 0..self.n {
            if self.x[scratch][j] {
                perm |= 1u64 << j;
                if self.z[scratch][j] {
                    // A Y in the scratch Pauli contributes a factor i.
                    e = (e + 1) & 3;
                }
            }
        }
        (perm, self.phase_offset * i_pow(e) * nrm)
    }

    /// Visit every basis state with nonzero amplitude; stop early when
    /// `visit` returns false
    ///
    /// After a forced measurement broke unitarity, the register reports
    /// no amplitudes at all.
    pub(crate) fn enumerate_basis<F>(&mut self, mut visit: F)
    where
        F: FnMut(Permutation, Complex) -> bool,
    {
        if self.is_unitarity_broken {
            return;
        }
        let g = self.gaussian();
        self.seed(g);

        let nrm = (1.0 / (1u64 << g) as Real).sqrt();
        let (perm, amp) = self.basis_amp(nrm);
        if !visit(perm, amp) {
            return;
        }

        let scratch = self.scratch();
        for t in 0..(1u64 << g) - 1 {
            let t2 = t ^ (t + 1);
            for i in 0..g {
                if (t2 >> i) & 1 == 1 {
                    self.rowmult(scratch, self.n + i);
                }
            }
            let (perm, amp) = self.basis_amp(nrm);
            if !visit(perm, amp) {
                return;
            }
        }
    }

    /// Amplitude of one basis state, zero when outside the support
    pub(crate) fn amplitude(&mut self, perm: Permutation) -> Complex {
        let mut out = ZERO_C;
        self.enumerate_basis(|p, a| {
            if p == perm {
                out = a;
                false
            } else {
                true
            }
        });
        out
    }

    /// The full sparse state: every nonzero basis amplitude
    pub(crate) fn state_map(&mut self) -> BTreeMap<Permutation, Complex> {
        let mut map = BTreeMap::new();
        self.enumerate_basis(|p, a| {
            map.insert(p, a);
            true
        });
        map
    }
}
