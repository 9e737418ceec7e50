//! Ticket types.
//!
//! Regular and AI tickets run the same retarget and pool algorithms over
//! separate parameters and header fields. [`TicketKind`] selects which.

use crate::chain_params::{ChainParams, TicketEconomics};
use crate::header::Header;
use crate::transaction::{ScriptClass, Transaction};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketType {
    Regular,
    Ai,
}

impl TicketType {
    /// Single byte identifying the type in storage keys.
    pub fn tag(&self) -> u8 {
        match self {
            TicketType::Regular => 0,
            TicketType::Ai => 1,
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketType::Regular => f.write_str("regular"),
            TicketType::Ai => f.write_str("ai"),
        }
    }
}

/// Accessors for one ticket type.
pub trait TicketKind: Send + Sync + 'static {
    const TICKET_TYPE: TicketType;

    fn economics(params: &ChainParams) -> &TicketEconomics;

    /// Live pool size recorded in the header.
    fn pool_size(header: &Header) -> u32;

    /// Purchases included in the block.
    fn fresh_stake(header: &Header) -> u8;

    /// Ticket price the block committed to.
    fn stake_difficulty(header: &Header) -> i64;

    fn is_purchase(tx: &Transaction) -> bool;
}

/// Regular tickets.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegularTickets;

/// AI tickets.
#[derive(Debug, Clone, Copy, Default)]
pub struct AiTickets;

impl TicketKind for RegularTickets {
    const TICKET_TYPE: TicketType = TicketType::Regular;

    fn economics(params: &ChainParams) -> &TicketEconomics {
        &params.tickets
    }

    fn pool_size(header: &Header) -> u32 {
        header.pool_size
    }

    fn fresh_stake(header: &Header) -> u8 {
        header.fresh_stake
    }

    fn stake_difficulty(header: &Header) -> i64 {
        header.sbits
    }

    fn is_purchase(tx: &Transaction) -> bool {
        tx.is_ticket_purchase_of(ScriptClass::StakeSubmission)
    }
}

impl TicketKind for AiTickets {
    const TICKET_TYPE: TicketType = TicketType::Ai;

    fn economics(params: &ChainParams) -> &TicketEconomics {
        &params.ai_tickets
    }

    fn pool_size(header: &Header) -> u32 {
        header.ai_pool_size
    }

    fn fresh_stake(header: &Header) -> u8 {
        header.ai_fresh_stake
    }

    fn stake_difficulty(header: &Header) -> i64 {
        header.ai_sbits
    }

    fn is_purchase(tx: &Transaction) -> bool {
        tx.is_ticket_purchase_of(ScriptClass::AiStakeSubmission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_accessors() {
        let header = Header {
            pool_size: 10,
            fresh_stake: 2,
            sbits: 300,
            ai_pool_size: 20,
            ai_fresh_stake: 4,
            ai_sbits: 600,
            ..Default::default()
        };
        assert_eq!(RegularTickets::pool_size(&header), 10);
        assert_eq!(RegularTickets::fresh_stake(&header), 2);
        assert_eq!(RegularTickets::stake_difficulty(&header), 300);
        assert_eq!(AiTickets::pool_size(&header), 20);
        assert_eq!(AiTickets::fresh_stake(&header), 4);
        assert_eq!(AiTickets::stake_difficulty(&header), 600);
    }

    #[test]
    fn test_economics_selection() {
        let params = ChainParams::mainnet();
        assert_eq!(RegularTickets::economics(&params), &params.tickets);
        assert_eq!(AiTickets::economics(&params), &params.ai_tickets);
        assert_ne!(RegularTickets::TICKET_TYPE.tag(), AiTickets::TICKET_TYPE.tag());
        assert_eq!(AiTickets::TICKET_TYPE.to_string(), "ai");
    }
}
