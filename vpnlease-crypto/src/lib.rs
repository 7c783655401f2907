//! Client tunnel identity.
//!
//! The client authenticates to gateways with an X25519 key pair. Keys are
//! exchanged with the authority and the tunnel as standard base64 strings
//! (44 characters for 32 bytes).
//!
//! A key pair is generated once per account and never rotated afterwards;
//! leases are bound to its public half.

mod error;
mod key;

pub use error::{CryptoError, CryptoResult};
pub use key::{public_key_from_private, KeyPair, KEY_SIZE};
