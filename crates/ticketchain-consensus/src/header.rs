//! Block header fields consumed by the retargeters and the stake resolver.

use crate::hash::{blake2b256, Hash};
use serde::{Deserialize, Serialize};

/// Block header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Header {
    pub version: i32,
    pub prev_block: Hash,
    pub merkle_root: Hash,
    /// Compact proof-of-work target.
    pub bits: u32,
    /// Regular ticket price in atoms.
    pub sbits: i64,
    pub height: u32,
    /// Unix seconds.
    pub timestamp: i64,
    /// Regular votes included in the block.
    pub voters: u16,
    /// Regular ticket purchases included in the block.
    pub fresh_stake: u8,
    pub revocations: u8,
    /// Live regular tickets after connecting the block.
    pub pool_size: u32,
    /// AI ticket price in atoms.
    pub ai_sbits: i64,
    pub ai_fresh_stake: u8,
    pub ai_pool_size: u32,
    pub nonce: u32,
}

impl Header {
    /// Serialized length of [`Header::to_bytes`].
    pub const SIZE: usize = 4 + 32 + 32 + 4 + 8 + 4 + 8 + 2 + 1 + 1 + 4 + 8 + 1 + 4 + 4;

    /// Fixed big-endian layout used for hashing.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(self.prev_block.as_bytes());
        out.extend_from_slice(self.merkle_root.as_bytes());
        out.extend_from_slice(&self.bits.to_be_bytes());
        out.extend_from_slice(&self.sbits.to_be_bytes());
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&self.voters.to_be_bytes());
        out.push(self.fresh_stake);
        out.push(self.revocations);
        out.extend_from_slice(&self.pool_size.to_be_bytes());
        out.extend_from_slice(&self.ai_sbits.to_be_bytes());
        out.push(self.ai_fresh_stake);
        out.extend_from_slice(&self.ai_pool_size.to_be_bytes());
        out.extend_from_slice(&self.nonce.to_be_bytes());
        out
    }

    /// Block hash. Also seeds the ticket lottery for the next block.
    pub fn hash(&self) -> Hash {
        Hash(blake2b256(&[&self.to_bytes()]))
    }
}
