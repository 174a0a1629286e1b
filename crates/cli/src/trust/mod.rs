//! Bearer-token trust: Ed25519 key generation, token issuance and
//! verification.

pub mod keygen;
pub mod token;
