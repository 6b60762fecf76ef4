//! Markov brain decoded from a genome.
//!
//! A genome is scanned for the start-codon pair `42, 213`. Each occurrence
//! introduces a deterministic logic gate:
//!
//! ```text
//! [42, 213, n_in, n_out, in0..in3, out0..out3, table[0..2^n_in]]
//! ```
//!
//! `n_in` and `n_out` are taken modulo 4 plus one, unit indices modulo the
//! unit count, and each table entry is masked to `n_out` bits. Reads past the
//! end of the genome wrap around.

/// Codon pair that starts a gate.
pub const START_CODON: [u8; 2] = [42, 213];

/// Maximum gate fan-in / fan-out.
const MAX_GATE_WIDTH: usize = 4;

/// A deterministic logic gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicGate {
    /// Input unit indices, most significant bit first.
    pub inputs: Vec<usize>,
    /// Output unit indices; bit `k` of a table entry drives `outputs[k]`.
    pub outputs: Vec<usize>,
    /// Output pattern for every input pattern.
    pub table: Vec<u8>,
}

impl LogicGate {
    /// Output bit pattern for the given unit state.
    fn fire(&self, state: &[u8]) -> u8 {
        let index = self
            .inputs
            .iter()
            .fold(0usize, |acc, &i| (acc << 1) | (state[i] & 1) as usize);
        self.table[index]
    }
}

/// Network of logic gates over sensor, hidden and motor units.
#[derive(Debug, Clone)]
pub struct MarkovBrain {
    num_units: usize,
    gates: Vec<LogicGate>,
}

impl MarkovBrain {
    /// Decode every gate in `codons`.
    pub fn from_genome(codons: &[u8], num_units: usize) -> Self {
        let len = codons.len();
        let mut gates = Vec::new();
        if len < 2 || num_units == 0 {
            return Self { num_units, gates };
        }

        let at = |i: usize| codons[i % len];
        for start in 0..len - 1 {
            if codons[start] != START_CODON[0] || codons[start + 1] != START_CODON[1] {
                continue;
            }

            let base = start + 2;
            let n_in = (at(base) as usize % MAX_GATE_WIDTH) + 1;
            let n_out = (at(base + 1) as usize % MAX_GATE_WIDTH) + 1;
            let inputs = (0..n_in)
                .map(|k| at(base + 2 + k) as usize % num_units)
                .collect();
            let outputs = (0..n_out)
                .map(|k| at(base + 2 + MAX_GATE_WIDTH + k) as usize % num_units)
                .collect();
            let mask = ((1u16 << n_out) - 1) as u8;
            let table_start = base + 2 + 2 * MAX_GATE_WIDTH;
            let table = (0..1usize << n_in)
                .map(|k| at(table_start + k) & mask)
                .collect();

            gates.push(LogicGate {
                inputs,
                outputs,
                table,
            });
        }

        Self { num_units, gates }
    }

    pub fn num_units(&self) -> usize {
        self.num_units
    }

    pub fn gates(&self) -> &[LogicGate] {
        &self.gates
    }

    /// Compute the next unit state. Outputs of different gates are OR-ed.
    pub fn step(&self, state: &[u8], next: &mut [u8]) {
        next.fill(0);
        for gate in &self.gates {
            let fired = gate.fire(state);
            for (bit, &unit) in gate.outputs.iter().enumerate() {
                if (fired >> bit) & 1 == 1 {
                    next[unit] = 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Gate copying unit 0 to unit 1.
    fn copy_gate_genome() -> Vec<u8> {
        let mut genome = vec![127, 42, 213, 0, 0];
        genome.extend([0, 0, 0, 0]); // inputs: unit 0
        genome.extend([1, 0, 0, 0]); // outputs: unit 1
        genome.extend([0, 1]); // table
        genome.extend([127; 4]);
        genome
    }

    #[test]
    fn test_decode_single_gate() {
        let brain = MarkovBrain::from_genome(&copy_gate_genome(), 3);
        assert_eq!(brain.gates().len(), 1);
        let gate = &brain.gates()[0];
        assert_eq!(gate.inputs, vec![0]);
        assert_eq!(gate.outputs, vec![1]);
        assert_eq!(gate.table, vec![0, 1]);
    }

    #[test]
    fn test_step_copies_input() {
        let brain = MarkovBrain::from_genome(&copy_gate_genome(), 3);
        let mut next = vec![0; 3];

        brain.step(&[1, 0, 0], &mut next);
        assert_eq!(next, vec![0, 1, 0]);

        brain.step(&[0, 1, 1], &mut next);
        assert_eq!(next, vec![0, 0, 0]);
    }

    #[test]
    fn test_no_start_codon_means_no_gates() {
        let brain = MarkovBrain::from_genome(&[127; 64], 8);
        assert!(brain.gates().is_empty());
    }

    #[test]
    fn test_truncated_gate_wraps() {
        // Start codon at the very end; the gate body wraps to the front.
        let mut genome = vec![3u8; 20];
        genome[18] = 42;
        genome[19] = 213;
        let brain = MarkovBrain::from_genome(&genome, 5);
        assert_eq!(brain.gates().len(), 1);
        assert_eq!(brain.gates()[0].inputs.len(), 4);
        assert_eq!(brain.gates()[0].table.len(), 16);
    }
}
