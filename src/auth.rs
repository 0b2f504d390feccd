//! Session credential models: redacted secrets, the access/refresh pair, and token responses.

pub mod pair;
pub mod response;
pub mod secret;

pub use pair::*;
pub use response::*;
pub use secret::*;
