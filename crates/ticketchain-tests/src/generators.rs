//! Test data generators.

use ticketchain_consensus::{Hash, Header, OutPoint, ScriptClass, Transaction, TxIn, TxOut};

/// Deterministic hash from a label and a counter.
pub fn test_hash(label: &str, n: u64) -> Hash {
    Hash::digest(format!("{}:{}", label, n).as_bytes())
}

fn output(class: ScriptClass, value: i64) -> TxOut {
    TxOut {
        value,
        version: 0,
        class,
        addresses: vec![],
    }
}

/// Ticket purchase spending `inputs` outputs of a unique funding transaction.
///
/// `submission` selects the ticket type.
pub fn ticket_purchase(submission: ScriptClass, seed: &str, inputs: u32) -> Transaction {
    let funding = Hash::digest(seed.as_bytes());
    let mut outputs = vec![output(submission, 10_000 * inputs as i64)];
    for _ in 0..inputs {
        outputs.push(output(ScriptClass::StakeCommitment, 0));
        outputs.push(output(ScriptClass::StakeChange, 0));
    }
    Transaction {
        version: 1,
        inputs: (0..inputs)
            .map(|index| TxIn {
                previous_output: OutPoint {
                    hash: funding,
                    index,
                },
                value_in: 10_000,
                sequence: u32::MAX,
            })
            .collect(),
        outputs,
        ..Default::default()
    }
}

/// Ordinary payment that is not a ticket purchase.
pub fn payment(seed: &str) -> Transaction {
    Transaction {
        version: 1,
        inputs: vec![TxIn {
            previous_output: OutPoint {
                hash: Hash::digest(seed.as_bytes()),
                index: 0,
            },
            value_in: 5_000,
            sequence: u32::MAX,
        }],
        outputs: vec![output(ScriptClass::PubKeyHash, 4_000)],
        ..Default::default()
    }
}

/// Headers of a linear chain spaced `spacing` seconds apart with fixed bits.
pub fn linear_headers(len: u32, bits: u32, spacing: i64) -> Vec<Header> {
    let mut headers: Vec<Header> = Vec::with_capacity(len as usize);
    for height in 0..len {
        let prev_block = headers.last().map(Header::hash).unwrap_or(Hash::ZERO);
        headers.push(Header {
            prev_block,
            height,
            bits,
            timestamp: 1_600_000_000 + height as i64 * spacing,
            ..Default::default()
        });
    }
    headers
}
