//! Client for the VPN lease authority.
//!
//! The authority exposes four resources over JSON/HTTP:
//!
//! | Call                         | Result                                  |
//! |------------------------------|-----------------------------------------|
//! | `POST /account`              | `{accountId}`                           |
//! | `GET /account/{id}`          | `{accountId, activeUntil}`              |
//! | `GET /gateway`               | `[{publicKey, ipv4, port, niceName}]`   |
//! | `GET /lease?accountId=`      | `[{publicKey, gatewayId, vip4, vip6, expires}]` |
//! | `POST /lease`                | `{vip4, vip6, expires}`                 |
//! | `DELETE /lease`              | empty                                   |
//!
//! [`Authority`] abstracts these calls so the reconciliation engine can run
//! against [`HttpAuthority`] in production and [`mock::MockAuthority`] in
//! tests. [`call_with_retry`] applies the fixed retry budget.

mod authority;
mod error;
mod http;
pub mod mock;
mod retry;

pub use authority::{Authority, Operation};
pub use error::{ApiError, ApiResult};
pub use http::{HttpAuthority, HttpAuthorityConfig};
pub use retry::{call_with_retry, MAX_RETRIES};
