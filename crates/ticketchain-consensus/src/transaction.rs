//! Minimal transaction model.
//!
//! Script evaluation lives elsewhere; outputs arrive here already classified
//! together with the addresses their scripts pay to.

use crate::hash::{blake2b256, Hash};
use serde::{Deserialize, Serialize};

/// Expiry value meaning "never expires".
pub const NO_EXPIRY: u32 = 0;

/// Maximum inputs of a ticket purchase.
pub const MAX_TICKET_INPUTS: usize = 64;

/// Reference to a previous output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub previous_output: OutPoint,
    pub value_in: i64,
    pub sequence: u32,
}

/// Standard script classes, as decoded by the script engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptClass {
    NonStandard,
    PubKeyHash,
    ScriptHash,
    NullData,
    StakeSubmission,
    AiStakeSubmission,
    StakeGen,
    StakeRevocation,
    StakeChange,
    StakeCommitment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: i64,
    pub version: u16,
    pub class: ScriptClass,
    /// Addresses the output script pays to.
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u16,
    pub lock_time: u32,
    pub expiry: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
}

fn class_tag(class: ScriptClass) -> u8 {
    match class {
        ScriptClass::NonStandard => 0,
        ScriptClass::PubKeyHash => 1,
        ScriptClass::ScriptHash => 2,
        ScriptClass::NullData => 3,
        ScriptClass::StakeSubmission => 4,
        ScriptClass::AiStakeSubmission => 5,
        ScriptClass::StakeGen => 6,
        ScriptClass::StakeRevocation => 7,
        ScriptClass::StakeChange => 8,
        ScriptClass::StakeCommitment => 9,
    }
}

impl Transaction {
    /// Big-endian byte layout used for hashing.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&self.lock_time.to_be_bytes());
        out.extend_from_slice(&self.expiry.to_be_bytes());
        out.extend_from_slice(&(self.inputs.len() as u32).to_be_bytes());
        for input in &self.inputs {
            out.extend_from_slice(input.previous_output.hash.as_bytes());
            out.extend_from_slice(&input.previous_output.index.to_be_bytes());
            out.extend_from_slice(&input.value_in.to_be_bytes());
            out.extend_from_slice(&input.sequence.to_be_bytes());
        }
        out.extend_from_slice(&(self.outputs.len() as u32).to_be_bytes());
        for output in &self.outputs {
            out.extend_from_slice(&output.value.to_be_bytes());
            out.extend_from_slice(&output.version.to_be_bytes());
            out.push(class_tag(output.class));
            out.extend_from_slice(&(output.addresses.len() as u32).to_be_bytes());
            for addr in &output.addresses {
                out.extend_from_slice(&(addr.len() as u32).to_be_bytes());
                out.extend_from_slice(addr.as_bytes());
            }
        }
        out
    }

    pub fn hash(&self) -> Hash {
        Hash(blake2b256(&[&self.to_bytes()]))
    }

    /// Check the shape of a ticket purchase whose submission output has
    /// class `submission`.
    ///
    /// Output 0 is the submission, odd outputs are commitments and even
    /// outputs from 2 on are change, with one commitment/change pair per input.
    pub fn is_ticket_purchase_of(&self, submission: ScriptClass) -> bool {
        let n_in = self.inputs.len();
        if n_in == 0 || n_in > MAX_TICKET_INPUTS {
            return false;
        }
        if self.outputs.len() != 1 + 2 * n_in {
            return false;
        }
        self.outputs.iter().enumerate().all(|(i, out)| match i {
            0 => out.class == submission,
            i if i % 2 == 1 => out.class == ScriptClass::StakeCommitment,
            _ => out.class == ScriptClass::StakeChange,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(class: ScriptClass) -> TxOut {
        TxOut {
            value: 0,
            version: 0,
            class,
            addresses: vec![],
        }
    }

    fn input(index: u32) -> TxIn {
        TxIn {
            previous_output: OutPoint {
                hash: Hash::ZERO,
                index,
            },
            value_in: 0,
            sequence: u32::MAX,
        }
    }

    fn purchase(submission: ScriptClass, inputs: u32) -> Transaction {
        let mut outputs = vec![output(submission)];
        for _ in 0..inputs {
            outputs.push(output(ScriptClass::StakeCommitment));
            outputs.push(output(ScriptClass::StakeChange));
        }
        Transaction {
            inputs: (0..inputs).map(input).collect(),
            outputs,
            ..Default::default()
        }
    }

    #[test]
    fn test_ticket_purchase_shape() {
        let tx = purchase(ScriptClass::StakeSubmission, 2);
        assert!(tx.is_ticket_purchase_of(ScriptClass::StakeSubmission));
        assert!(!tx.is_ticket_purchase_of(ScriptClass::AiStakeSubmission));

        let ai = purchase(ScriptClass::AiStakeSubmission, 1);
        assert!(ai.is_ticket_purchase_of(ScriptClass::AiStakeSubmission));
    }

    #[test]
    fn test_ticket_purchase_rejects_bad_layout() {
        let mut tx = purchase(ScriptClass::StakeSubmission, 1);
        tx.outputs.swap(1, 2);
        assert!(!tx.is_ticket_purchase_of(ScriptClass::StakeSubmission));

        let mut tx = purchase(ScriptClass::StakeSubmission, 1);
        tx.outputs.pop();
        assert!(!tx.is_ticket_purchase_of(ScriptClass::StakeSubmission));

        let tx = purchase(ScriptClass::StakeSubmission, 0);
        assert!(!tx.is_ticket_purchase_of(ScriptClass::StakeSubmission));
    }

    #[test]
    fn test_hash_depends_on_outputs() {
        let a = purchase(ScriptClass::StakeSubmission, 1);
        let mut b = a.clone();
        b.outputs[0].value = 5;
        assert_ne!(a.hash(), b.hash());
    }
}
