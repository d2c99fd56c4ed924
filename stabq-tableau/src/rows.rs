//! Tableau row storage and the CHP row primitives
//!
//! For `n` qubits the tableau holds `2n+1` rows: destabilizers in
//! `[0, n)`, stabilizers in `[n, 2n)`, and one scratch row used by
//! Gaussian elimination, seeding and deterministic measurement. Each row
//! is a Pauli product: X and Z bit vectors plus a phase exponent
//! `r ∈ {0,1,2,3}` meaning `i^r`.

use rayon::prelude::*;
use stabq_core::numeric::{Complex, ONE_C};

/// Row count above which per-row gate kernels fan out over rayon
const PARALLEL_THRESHOLD: usize = 128;

#[derive(Clone, Debug)]
pub(crate) struct Rows {
    pub(crate) n: usize,
    pub(crate) x: Vec<Vec<bool>>,
    pub(crate) z: Vec<Vec<bool>>,
    pub(crate) r: Vec<u8>,
    pub(crate) phase_offset: Complex,
    pub(crate) is_unitarity_broken: bool,
}

impl Rows {
    /// Identity tableau over |0...0>
    pub(crate) fn new(n: usize) -> Self {
        let count = 2 * n + 1;
        let mut x = vec![vec![false; n]; count];
        let mut z = vec![vec![false; n]; count];
        for i in 0..n {
            x[i][i] = true;
            z[n + i][i] = true;
        }
        Self {
            n,
            x,
            z,
            r: vec![0; count],
            phase_offset: ONE_C,
            is_unitarity_broken: false,
        }
    }

    /// Reset to the basis state `perm`
    pub(crate) fn set_permutation(&mut self, perm: u64) {
        let n = self.n;
        *self = Rows::new(n);
        for i in 0..n {
            if (perm >> i) & 1 == 1 {
                self.r[n + i] = 2;
            }
        }
    }

    /// Drop every qubit, leaving a zero-width register
    pub(crate) fn clear(&mut self) {
        *self = Rows::new(0);
    }

    #[inline]
    pub(crate) fn scratch(&self) -> usize {
        2 * self.n
    }

    /// Set row `i` equal to row `k`
    pub(crate) fn rowcopy(&mut self, i: usize, k: usize) {
        if i == k {
            return;
        }
        self.x[i] = self.x[k].clone();
        self.z[i] = self.z[k].clone();
        self.r[i] = self.r[k];
    }

    /// Exchange rows `i` and `k`; does not change the represented state
    pub(crate) fn rowswap(&mut self, i: usize, k: usize) {
        if i == k {
            return;
        }
        self.x.swap(i, k);
        self.z.swap(i, k);
        self.r.swap(i, k);
    }

    /// Set row `i` to the `b`-th observable (X_0..X_{n-1}, Z_0..Z_{n-1})
    pub(crate) fn rowset(&mut self, i: usize, b: usize) {
        self.x[i].fill(false);
        self.z[i].fill(false);
        self.r[i] = 0;
        if b < self.n {
            self.x[i][b] = true;
        } else {
            self.z[i][b - self.n] = true;
        }
    }

    /// Phase exponent of row `i` left-multiplied by row `k`
    pub(crate) fn clifford(&self, i: usize, k: usize) -> u8 {
        let (xi, zi) = (&self.x[i], &self.z[i]);
        let (xk, zk) = (&self.x[k], &self.z[k]);

        // Power to which i is raised by anticommutation bookkeeping.
        let mut e: i32 = 0;
        for j in 0..self.n {
            if xk[j] && !zk[j] {
                // X on the left: XY = iZ, XZ = -iY
                e += i32::from(xi[j] && zi[j]);
                e -= i32::from(!xi[j] && zi[j]);
            } else if xk[j] && zk[j] {
                // Y on the left: YZ = iX, YX = -iZ
                e += i32::from(!xi[j] && zi[j]);
                e -= i32::from(xi[j] && !zi[j]);
            } else if !xk[j] && zk[j] {
                // Z on the left: ZX = iY, ZY = -iX
                e += i32::from(xi[j] && !zi[j]);
                e -= i32::from(xi[j] && zi[j]);
            }
        }
        (e + i32::from(self.r[i]) + i32::from(self.r[k])).rem_euclid(4) as u8
    }

    /// Left-multiply row `i` by row `k`; does not change the represented state
    pub(crate) fn rowmult(&mut self, i: usize, k: usize) {
        self.r[i] = self.clifford(i, k);
        let xk = self.x[k].clone();
        let zk = self.z[k].clone();
        for j in 0..self.n {
            self.x[i][j] ^= xk[j];
            self.z[i][j] ^= zk[j];
        }
    }

    /// Apply `f` to every non-scratch row
    pub(crate) fn for_each_row<F>(&mut self, f: F)
    where
        F: Fn(&mut [bool], &mut [bool], &mut u8) + Send + Sync,
    {
        let end = 2 * self.n;
        let xs = &mut self.x[..end];
        let zs = &mut self.z[..end];
        let rs = &mut self.r[..end];
        if end >= PARALLEL_THRESHOLD {
            xs.par_iter_mut()
                .zip(zs.par_iter_mut())
                .zip(rs.par_iter_mut())
                .for_each(|((x, z), r)| f(x, z, r));
        } else {
            for ((x, z), r) in xs.iter_mut().zip(zs.iter_mut()).zip(rs.iter_mut()) {
                f(x, z, r);
            }
        }
    }

    pub(crate) fn h_kernel(&mut self, t: usize) {
        self.for_each_row(|x, z, r| {
            let xt = x[t];
            x[t] = z[t];
            z[t] = xt;
            if x[t] && z[t] {
                *r ^= 2;
            }
        });
    }

    pub(crate) fn x_kernel(&mut self, t: usize) {
        self.for_each_row(|_x, z, r| {
            if z[t] {
                *r ^= 2;
            }
        });
    }

    pub(crate) fn y_kernel(&mut self, t: usize) {
        self.for_each_row(|x, z, r| {
            if x[t] ^ z[t] {
                *r ^= 2;
            }
        });
    }

    pub(crate) fn z_kernel(&mut self, t: usize) {
        self.for_each_row(|x, _z, r| {
            if x[t] {
                *r ^= 2;
            }
        });
    }

    pub(crate) fn s_kernel(&mut self, t: usize) {
        self.for_each_row(|x, z, r| {
            if x[t] && z[t] {
                *r ^= 2;
            }
            z[t] ^= x[t];
        });
    }

    pub(crate) fn sdg_kernel(&mut self, t: usize) {
        self.for_each_row(|x, z, r| {
            z[t] ^= x[t];
            if x[t] && z[t] {
                *r ^= 2;
            }
        });
    }

    pub(crate) fn cnot_kernel(&mut self, c: usize, t: usize) {
        self.for_each_row(|x, z, r| {
            if x[c] && z[t] && (x[t] == z[c]) {
                *r ^= 2;
            }
            x[t] ^= x[c];
            z[c] ^= z[t];
        });
    }

    /// Swap is a relabeling: exchange the two columns in every row
    pub(crate) fn swap_kernel(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.for_each_row(|x, z, _r| {
            x.swap(a, b);
            z.swap(a, b);
        });
    }

    /// True iff qubit `t` is a Z-basis eigenstate
    pub(crate) fn is_separable_z(&self, t: usize) -> bool {
        (self.n..2 * self.n).all(|i| !self.x[i][t])
    }

    /// Smallest stabilizer row anticommuting with Z_t, if any
    pub(crate) fn anticommuting_stabilizer(&self, t: usize) -> Option<usize> {
        (self.n..2 * self.n).find(|&i| self.x[i][t])
    }

    /// Deterministic Z measurement outcome of qubit `t`
    ///
    /// Accumulates into the scratch row the stabilizers paired with every
    /// destabilizer that anticommutes with Z_t; the outcome parity is the
    /// scratch phase. Only valid when no stabilizer anticommutes with Z_t.
    pub(crate) fn z_outcome(&mut self, t: usize) -> bool {
        let n = self.n;
        let scratch = self.scratch();
        self.x[scratch].fill(false);
        self.z[scratch].fill(false);
        self.r[scratch] = 0;
        for i in 0..n {
            if self.x[i][t] {
                self.rowmult(scratch, i + n);
            }
        }
        self.r[scratch] == 2
    }

    /// Collapse after a random measurement outcome on qubit `t`
    ///
    /// `p` is the chosen anticommuting stabilizer row. Every other
    /// anticommuting row is multiplied by it, the old stabilizer is
    /// demoted to the paired destabilizer, and row `p` becomes `±Z_t`.
    pub(crate) fn collapse(&mut self, p: usize, t: usize, outcome: bool) {
        for i in 0..2 * self.n {
            if i != p && self.x[i][t] {
                self.rowmult(i, p);
            }
        }
        self.rowcopy(p - self.n, p);
        self.rowset(p, t + self.n);
        self.r[p] = if outcome { 2 } else { 0 };
    }
}
