//! The authority contract.

use crate::error::ApiResult;
use async_trait::async_trait;
use std::fmt;
use vpnlease_types::{Account, Gateway, Lease, LeaseGrant, LeaseRequest};

/// The remote operations the client relies on.
///
/// Each method is a single round trip; retrying is the caller's concern.
#[async_trait]
pub trait Authority: Send + Sync {
    /// Creates a new account.
    async fn create_account(&self) -> ApiResult<Account>;

    /// Fetches an account and its expiry.
    async fn account_info(&self, account_id: &str) -> ApiResult<Account>;

    /// Lists available gateways.
    async fn gateways(&self) -> ApiResult<Vec<Gateway>>;

    /// Lists all leases held by an account.
    async fn leases(&self, account_id: &str) -> ApiResult<Vec<Lease>>;

    /// Requests a lease binding a key to a gateway.
    async fn request_lease(&self, request: &LeaseRequest) -> ApiResult<LeaseGrant>;

    /// Releases a lease.
    async fn delete_lease(&self, request: &LeaseRequest) -> ApiResult<()>;
}

/// Names the authority operations, for logging and call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAccount,
    AccountInfo,
    Gateways,
    Leases,
    RequestLease,
    DeleteLease,
}

impl Operation {
    /// Returns a short stable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateAccount => "create account",
            Operation::AccountInfo => "account info",
            Operation::Gateways => "gateways",
            Operation::Leases => "leases",
            Operation::RequestLease => "new lease",
            Operation::DeleteLease => "delete lease",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
