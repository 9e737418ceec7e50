//! # ticketchain-tests
//!
//! Integration tests for the ticketchain consensus core.
//!
//! This crate provides:
//! - A chain builder producing blocks with real ticket purchases and votes
//! - A storage wrapper counting reads
//! - Resolver scenarios covering reorgs, eviction and storage fallback
//! - Property-based tests for the compact codec and difficulty clamps

pub mod generators;
pub mod harness;


#[cfg(test)]
mod resolver_tests;

#[cfg(test)]
mod storage_tests;

#[cfg(test)]
mod property_tests;

pub use generators::*;
pub use harness::*;
