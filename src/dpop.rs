//! DPoP proof issuance (RFC 9449): ES256 keys, compact JWS helpers, the replay-nonce tracker,
//! the per-request proof generator, and `private_key_jwt` client assertions.

pub mod assertion;
pub mod jwt;
pub mod key;
pub mod nonce;
pub mod proof;

pub use assertion::*;
pub use jwt::*;
pub use key::*;
pub use nonce::*;
pub use proof::*;
