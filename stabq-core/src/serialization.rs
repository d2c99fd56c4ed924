//! Whitespace-delimited textual circuit format
//!
//! A circuit is written as `qubitCount gateCount gate*`; each gate as
//! `target |controls| control* |payloads| (pattern m00 m01 m10 m11)*`,
//! with every complex entry in the `(re,im)` stream form. Emission uses
//! single spaces; parsing accepts any whitespace between tokens. Scalar
//! formatting is shortest-round-trip, so `parse(serialize(c)) == c`
//! exactly at the active precision.

use crate::circuit::Circuit;
use crate::error::{QuantumError, Result};
use crate::gate::CircuitGate;
use crate::matrix::Matrix2;
use crate::numeric::{Complex, Real};
use crate::qubit::{Permutation, QubitId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

fn write_complex(f: &mut fmt::Formatter<'_>, c: &Complex) -> fmt::Result {
    write!(f, "({},{})", c.re, c.im)
}

impl fmt::Display for CircuitGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.target().index(), self.controls().len())?;
        for c in self.controls() {
            write!(f, " {}", c.index())?;
        }
        write!(f, " {}", self.payloads().len())?;
        for (pattern, m) in self.payloads() {
            write!(f, " {}", pattern)?;
            for entry in &m.0 {
                write!(f, " ")?;
                write_complex(f, entry)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.qubit_count(), self.len())?;
        for gate in self.gates() {
            write!(f, " {}", gate)?;
        }
        Ok(())
    }
}

/// Pull-based token reader over whitespace-separated text
struct Tokens<'a> {
    iter: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            iter: text.split_whitespace(),
        }
    }

    fn next(&mut self, what: &str) -> Result<&'a str> {
        self.iter
            .next()
            .ok_or_else(|| QuantumError::parse(format!("unexpected end of input, expected {what}")))
    }

    fn next_usize(&mut self, what: &str) -> Result<usize> {
        let tok = self.next(what)?;
        tok.parse()
            .map_err(|_| QuantumError::parse(format!("bad {what}: {tok:?}")))
    }

    fn next_u64(&mut self, what: &str) -> Result<u64> {
        let tok = self.next(what)?;
        tok.parse()
            .map_err(|_| QuantumError::parse(format!("bad {what}: {tok:?}")))
    }

    fn next_complex(&mut self, what: &str) -> Result<Complex> {
        let tok = self.next(what)?;
        let inner = tok
            .strip_prefix('(')
            .and_then(|t| t.strip_suffix(')'))
            .ok_or_else(|| QuantumError::parse(format!("bad {what}: {tok:?}")))?;
        let (re, im) = inner
            .split_once(',')
            .ok_or_else(|| QuantumError::parse(format!("bad {what}: {tok:?}")))?;
        let re: Real = re
            .parse()
            .map_err(|_| QuantumError::parse(format!("bad real part in {what}: {re:?}")))?;
        let im: Real = im
            .parse()
            .map_err(|_| QuantumError::parse(format!("bad imaginary part in {what}: {im:?}")))?;
        Ok(Complex::new(re, im))
    }

    fn finished(&mut self) -> Result<()> {
        match self.iter.next() {
            None => Ok(()),
            Some(tok) => Err(QuantumError::parse(format!("trailing token {tok:?}"))),
        }
    }
}

fn parse_gate(tokens: &mut Tokens<'_>) -> Result<CircuitGate> {
    let target = QubitId::new(tokens.next_usize("gate target")?);

    let control_count = tokens.next_usize("control count")?;
    let mut controls = BTreeSet::new();
    for _ in 0..control_count {
        if !controls.insert(QubitId::new(tokens.next_usize("control index")?)) {
            return Err(QuantumError::parse("duplicate control index"));
        }
    }

    let payload_count = tokens.next_usize("payload count")?;
    let mut payloads = BTreeMap::new();
    for _ in 0..payload_count {
        let pattern: Permutation = tokens.next_u64("payload pattern")?;
        let m00 = tokens.next_complex("m00")?;
        let m01 = tokens.next_complex("m01")?;
        let m10 = tokens.next_complex("m10")?;
        let m11 = tokens.next_complex("m11")?;
        if payloads
            .insert(pattern, Matrix2::new(m00, m01, m10, m11))
            .is_some()
        {
            return Err(QuantumError::parse("duplicate payload pattern"));
        }
    }

    CircuitGate::from_raw(target, controls, payloads)
}

impl FromStr for Circuit {
    type Err = QuantumError;

    fn from_str(text: &str) -> Result<Self> {
        let mut tokens = Tokens::new(text);
        let qubit_count = tokens.next_usize("qubit count")?;
        let gate_count = tokens.next_usize("gate count")?;
        let mut gates = Vec::with_capacity(gate_count);
        for _ in 0..gate_count {
            gates.push(parse_gate(&mut tokens)?);
        }
        tokens.finished()?;
        Ok(Circuit::from_parts(qubit_count, gates))
    }
}

impl FromStr for CircuitGate {
    type Err = QuantumError;

    fn from_str(text: &str) -> Result<Self> {
        let mut tokens = Tokens::new(text);
        let gate = parse_gate(&mut tokens)?;
        tokens.finished()?;
        Ok(gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(i: usize) -> QubitId {
        QubitId::new(i)
    }

    fn sample_circuit() -> Circuit {
        let mut circuit = Circuit::new(3);
        circuit.append_gate(CircuitGate::new(q(0), Matrix2::HADAMARD));
        circuit.append_gate(
            CircuitGate::with_controls(q(1), Matrix2::PAULI_X, [q(0)], 1).unwrap(),
        );
        circuit.append_gate(
            CircuitGate::with_controls(q(2), Matrix2::S, [q(0), q(1)], 3).unwrap(),
        );
        circuit
    }

    #[test]
    fn test_round_trip_exact() {
        let circuit = sample_circuit();
        let text = circuit.to_string();
        let parsed: Circuit = text.parse().unwrap();
        assert_eq!(parsed, circuit);
    }

    #[test]
    fn test_round_trip_preserves_payload_maps() {
        let circuit = sample_circuit();
        let parsed: Circuit = circuit.to_string().parse().unwrap();
        for (a, b) in parsed.gates().zip(circuit.gates()) {
            assert_eq!(a.target(), b.target());
            assert_eq!(a.controls(), b.controls());
            assert_eq!(a.payloads(), b.payloads());
        }
    }

    #[test]
    fn test_accepts_any_whitespace() {
        let text = sample_circuit().to_string().replace(' ', "\n\t ");
        let parsed: Circuit = text.parse().unwrap();
        assert_eq!(parsed, sample_circuit());
    }

    #[test]
    fn test_emits_single_spaces() {
        let text = sample_circuit().to_string();
        assert!(!text.contains("  "));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_swap_encoded_round_trip() {
        let circuit = Circuit::from_parts(2, [CircuitGate::swap_encoded(q(0), q(1))]);
        let parsed: Circuit = circuit.to_string().parse().unwrap();
        assert_eq!(parsed, circuit);
        assert!(parsed.gates().next().unwrap().is_swap());
    }

    #[test]
    fn test_empty_circuit() {
        let parsed: Circuit = "4 0".parse().unwrap();
        assert_eq!(parsed.qubit_count(), 4);
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_truncated_input_fails() {
        let err = "2 1 0 0".parse::<Circuit>().unwrap_err();
        assert!(matches!(err, QuantumError::Parse(_)));
    }

    #[test]
    fn test_trailing_garbage_fails() {
        let err = "2 0 7".parse::<Circuit>().unwrap_err();
        assert!(matches!(err, QuantumError::Parse(_)));
    }

    #[test]
    fn test_gate_round_trip() {
        let gate = CircuitGate::with_controls(q(1), Matrix2::PAULI_Y, [q(0)], 0).unwrap();
        let parsed: CircuitGate = gate.to_string().parse().unwrap();
        assert_eq!(parsed, gate);
    }
}
