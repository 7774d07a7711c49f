//! DeepBook swap backend
//!
//! Reads a DeepBook V3 pool's level-2 book through Sui JSON-RPC
//! simulation, quotes and validates swaps, builds unsigned programmable
//! transactions for a wallet to sign, and tracks submitted swaps to finality.

pub mod api;
pub mod blocklist;
pub mod config;
pub mod deepbook;
pub mod rpc;
pub mod types;
