use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stabq_core::{Circuit, CircuitGate, Matrix2, QubitId};

fn cancelling_pairs(c: &mut Criterion) {
    c.bench_function("append 1k cancelling H pairs", |b| {
        b.iter(|| {
            let mut circuit = Circuit::new(4);
            for i in 0..1000 {
                let q = QubitId::new(i % 4);
                circuit.append_gate(CircuitGate::new(q, Matrix2::HADAMARD));
            }
            black_box(circuit.len())
        })
    });
}

fn blocked_layers(c: &mut Criterion) {
    c.bench_function("append alternating H/CNOT layers", |b| {
        b.iter(|| {
            let mut circuit = Circuit::new(8);
            for layer in 0..100 {
                for q in 0..8 {
                    circuit.append_gate(CircuitGate::new(QubitId::new(q), Matrix2::HADAMARD));
                }
                for q in 0..7 {
                    let gate = CircuitGate::with_controls(
                        QubitId::new(q + 1),
                        Matrix2::PAULI_X,
                        [QubitId::new(q)],
                        1,
                    )
                    .unwrap();
                    circuit.append_gate(gate);
                }
                black_box(layer);
            }
            black_box(circuit.len())
        })
    });
}

criterion_group!(benches, cancelling_pairs, blocked_layers);
criterion_main!(benches);
