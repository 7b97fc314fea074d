// ============================================================================
// Market Resolve Module - Core Market, Pool & Assertion Logic
// ============================================================================
//
// This module contains the record types and pure rules of the market:
//   - markets: market records, outcome hashing, creation validation
//   - pool: reserve-ratio market maker math
//   - assertion: bonded assertions, bond sizing and fee split
//   - escalation: dispute keys and the verdict store
//   - policy: who may assert or dispute
//
// Orchestration (locks, balances, events) lives in crate::engine.
//
// ============================================================================

pub mod assertion;
pub mod escalation;
pub mod markets;
pub mod policy;
pub mod pool;

pub use assertion::*;
pub use escalation::*;
pub use markets::*;
pub use policy::*;
pub use pool::*;
