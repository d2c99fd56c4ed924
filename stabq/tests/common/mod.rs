//! Test support: a minimal dense state-vector simulator used as the
//! reference backend when checking circuit lowering. Not part of the
//! library surface.
#![allow(dead_code)]

use stabq::{Complex, Matrix2, Permutation, QubitId, Real, Result, Simulator};

const ZERO: Complex = Complex::new(0.0, 0.0);
const ONE: Complex = Complex::new(1.0, 0.0);

pub struct DenseSim {
    n: usize,
    amps: Vec<Complex>,
}

impl DenseSim {
    pub fn new(n: usize) -> Self {
        Self::with_permutation(n, 0)
    }

    pub fn with_permutation(n: usize, perm: Permutation) -> Self {
        let mut amps = vec![ZERO; 1 << n];
        amps[perm as usize] = ONE;
        Self { n, amps }
    }

    pub fn amplitudes(&self) -> &[Complex] {
        &self.amps
    }

    pub fn amplitude(&self, perm: Permutation) -> Complex {
        self.amps[perm as usize]
    }

    pub fn prob_one(&self, q: usize) -> Real {
        let bit = 1usize << q;
        self.amps
            .iter()
            .enumerate()
            .filter(|(i, _)| i & bit != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }

    fn apply<F: Fn(usize) -> bool>(&mut self, m: &Matrix2, t: usize, fires: F) {
        let bit = 1usize << t;
        for i in 0..self.amps.len() {
            if i & bit == 0 && fires(i) {
                let j = i | bit;
                let a0 = self.amps[i];
                let a1 = self.amps[j];
                self.amps[i] = m.0[0] * a0 + m.0[1] * a1;
                self.amps[j] = m.0[2] * a0 + m.0[3] * a1;
            }
        }
    }
}

impl Simulator for DenseSim {
    fn qubit_count(&self) -> usize {
        self.n
    }

    fn allocate(&mut self, length: usize) -> Result<()> {
        self.n += length;
        self.amps.resize(1 << self.n, ZERO);
        Ok(())
    }

    fn mtrx(&mut self, m: &Matrix2, target: QubitId) -> Result<()> {
        self.apply(m, target.index(), |_| true);
        Ok(())
    }

    fn mc_mtrx(&mut self, controls: &[QubitId], m: &Matrix2, target: QubitId) -> Result<()> {
        let mask: usize = controls.iter().map(|c| 1usize << c.index()).sum();
        self.apply(m, target.index(), |i| i & mask == mask);
        Ok(())
    }

    fn mac_mtrx(&mut self, controls: &[QubitId], m: &Matrix2, target: QubitId) -> Result<()> {
        let mask: usize = controls.iter().map(|c| 1usize << c.index()).sum();
        self.apply(m, target.index(), |i| i & mask == 0);
        Ok(())
    }

    fn swap(&mut self, a: QubitId, b: QubitId) -> Result<()> {
        let (abit, bbit) = (1usize << a.index(), 1usize << b.index());
        if abit == bbit {
            return Ok(());
        }
        for i in 0..self.amps.len() {
            if i & abit != 0 && i & bbit == 0 {
                self.amps.swap(i, i ^ abit ^ bbit);
            }
        }
        Ok(())
    }

    fn x(&mut self, q: QubitId) -> Result<()> {
        self.mtrx(&Matrix2::PAULI_X, q)
    }
}

/// Counts emitted X gates while forwarding everything to an inner sim
pub struct XCountingSim<S> {
    pub inner: S,
    pub x_count: usize,
}

impl<S: Simulator> XCountingSim<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, x_count: 0 }
    }
}

impl<S: Simulator> Simulator for XCountingSim<S> {
    fn qubit_count(&self) -> usize {
        self.inner.qubit_count()
    }

    fn allocate(&mut self, length: usize) -> Result<()> {
        self.inner.allocate(length)
    }

    fn mtrx(&mut self, m: &Matrix2, target: QubitId) -> Result<()> {
        self.inner.mtrx(m, target)
    }

    fn mc_mtrx(&mut self, controls: &[QubitId], m: &Matrix2, target: QubitId) -> Result<()> {
        self.inner.mc_mtrx(controls, m, target)
    }

    fn mac_mtrx(&mut self, controls: &[QubitId], m: &Matrix2, target: QubitId) -> Result<()> {
        self.inner.mac_mtrx(controls, m, target)
    }

    fn swap(&mut self, a: QubitId, b: QubitId) -> Result<()> {
        self.inner.swap(a, b)
    }

    fn x(&mut self, q: QubitId) -> Result<()> {
        self.x_count += 1;
        self.inner.x(q)
    }
}

/// Do two dense state vectors agree up to a global phase?
pub fn states_match_up_to_phase(a: &[Complex], b: &[Complex], tol: Real) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let pivot = (0..a.len()).max_by(|&i, &j| {
        a[i].norm_sqr()
            .partial_cmp(&a[j].norm_sqr())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let Some(pivot) = pivot else {
        return true;
    };
    if b[pivot].norm_sqr() < tol {
        return a[pivot].norm_sqr() < tol;
    }
    let phase = a[pivot] / b[pivot];
    a.iter()
        .zip(b.iter())
        .all(|(x, y)| (x - y * phase).norm_sqr() < tol)
}
