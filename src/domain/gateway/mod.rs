//! Provider wire protocols.
//!
//! Pure parsing, signing and response shapes for each payment provider.
//! No I/O happens here; application handlers drive the ledger.

pub mod click;
pub mod payme;
pub mod stripe;
