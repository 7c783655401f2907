//! An in-memory authority for tests.
//!
//! [`MockAuthority`] behaves like a small authority: it remembers accounts,
//! gateways and leases, and counts every call per [`Operation`]. Failures can
//! be queued per operation to exercise retry and fallback paths.

use crate::authority::{Authority, Operation};
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use vpnlease_types::{Account, Gateway, Lease, LeaseGrant, LeaseRequest};

/// A scripted failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// No response at all.
    Transport,
    /// A response with this non-success status.
    Status(u16),
}

impl MockFailure {
    fn to_error(self, operation: Operation) -> ApiError {
        match self {
            MockFailure::Transport => ApiError::Transport(format!("{operation}: connection reset")),
            MockFailure::Status(status) => ApiError::Rejected {
                status,
                body: format!("{operation} rejected"),
            },
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    accounts: HashMap<String, Account>,
    created: u32,
    new_account_expiry: DateTime<Utc>,
    gateways: Vec<Gateway>,
    leases: HashMap<String, Vec<Lease>>,
    next_vip: u32,
    lease_expiry: Option<DateTime<Utc>>,
    queued: HashMap<Operation, VecDeque<MockFailure>>,
    persistent: HashMap<Operation, MockFailure>,
    calls: HashMap<Operation, usize>,
    requested: Vec<LeaseRequest>,
    deleted: Vec<LeaseRequest>,
}

/// A stateful in-memory authority.
#[derive(Debug, Default)]
pub struct MockAuthority {
    state: Mutex<MockState>,
}

impl MockAuthority {
    /// Creates an empty authority.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    // ── Seeding ─────────────────────────────────────────────────

    /// Registers an account.
    pub fn add_account(&self, account_id: &str, active_until: DateTime<Utc>) {
        self.with_state(|s| {
            s.accounts
                .insert(account_id.to_string(), Account::new(account_id, active_until));
        });
    }

    /// Sets the expiry given to accounts created through `create_account`.
    pub fn set_new_account_expiry(&self, active_until: DateTime<Utc>) {
        self.with_state(|s| s.new_account_expiry = active_until);
    }

    /// Registers a gateway.
    pub fn add_gateway(&self, gateway: Gateway) {
        self.with_state(|s| s.gateways.push(gateway));
    }

    /// Removes a gateway by public key.
    pub fn remove_gateway(&self, public_key: &str) {
        self.with_state(|s| s.gateways.retain(|g| g.public_key != public_key));
    }

    /// Registers an existing lease for an account.
    pub fn add_lease(&self, account_id: &str, lease: Lease) {
        self.with_state(|s| {
            s.leases
                .entry(account_id.to_string())
                .or_default()
                .push(lease)
        });
    }

    /// Sets the expiry of leases granted through `request_lease`.
    pub fn set_lease_expiry(&self, expires: DateTime<Utc>) {
        self.with_state(|s| s.lease_expiry = Some(expires));
    }

    // ── Failure scripting ───────────────────────────────────────

    /// Makes the next `count` calls of `operation` fail.
    pub fn fail_next(&self, operation: Operation, count: usize, failure: MockFailure) {
        self.with_state(|s| {
            let queue = s.queued.entry(operation).or_default();
            queue.extend(std::iter::repeat_n(failure, count));
        });
    }

    /// Makes every call of `operation` fail until [`MockAuthority::heal`].
    pub fn fail_always(&self, operation: Operation, failure: MockFailure) {
        self.with_state(|s| {
            s.persistent.insert(operation, failure);
        });
    }

    /// Clears all scripted failures.
    pub fn heal(&self) {
        self.with_state(|s| {
            s.queued.clear();
            s.persistent.clear();
        });
    }

    // ── Inspection ──────────────────────────────────────────────

    /// Number of calls made to `operation`, failed ones included.
    pub fn calls(&self, operation: Operation) -> usize {
        self.with_state(|s| s.calls.get(&operation).copied().unwrap_or(0))
    }

    /// Total number of calls across all operations.
    pub fn total_calls(&self) -> usize {
        self.with_state(|s| s.calls.values().sum())
    }

    /// Successful lease requests, in order.
    pub fn requested_leases(&self) -> Vec<LeaseRequest> {
        self.with_state(|s| s.requested.clone())
    }

    /// Successful lease deletions, in order.
    pub fn deleted_leases(&self) -> Vec<LeaseRequest> {
        self.with_state(|s| s.deleted.clone())
    }

    /// Current leases of an account.
    pub fn leases_of(&self, account_id: &str) -> Vec<Lease> {
        self.with_state(|s| s.leases.get(account_id).cloned().unwrap_or_default())
    }

    fn enter(&self, operation: Operation) -> ApiResult<()> {
        self.with_state(|s| {
            *s.calls.entry(operation).or_insert(0) += 1;
            if let Some(failure) = s.queued.get_mut(&operation).and_then(|q| q.pop_front()) {
                return Err(failure.to_error(operation));
            }
            if let Some(failure) = s.persistent.get(&operation) {
                return Err(failure.to_error(operation));
            }
            Ok(())
        })
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::Rejected {
        status: 404,
        body: format!("{what} not found"),
    }
}

#[async_trait]
impl Authority for MockAuthority {
    async fn create_account(&self) -> ApiResult<Account> {
        self.enter(Operation::CreateAccount)?;
        Ok(self.with_state(|s| {
            s.created += 1;
            let account = Account::new(format!("account-{}", s.created), s.new_account_expiry);
            s.accounts.insert(account.account_id.clone(), account.clone());
            // Creation only reports the identifier.
            Account::new(account.account_id, DateTime::<Utc>::default())
        }))
    }

    async fn account_info(&self, account_id: &str) -> ApiResult<Account> {
        self.enter(Operation::AccountInfo)?;
        self.with_state(|s| s.accounts.get(account_id).cloned())
            .ok_or_else(|| not_found("account"))
    }

    async fn gateways(&self) -> ApiResult<Vec<Gateway>> {
        self.enter(Operation::Gateways)?;
        Ok(self.with_state(|s| s.gateways.clone()))
    }

    async fn leases(&self, account_id: &str) -> ApiResult<Vec<Lease>> {
        self.enter(Operation::Leases)?;
        Ok(self.leases_of(account_id))
    }

    async fn request_lease(&self, request: &LeaseRequest) -> ApiResult<LeaseGrant> {
        self.enter(Operation::RequestLease)?;
        self.with_state(|s| {
            if !s.accounts.contains_key(&request.account_id) {
                return Err(not_found("account"));
            }
            if !s.gateways.iter().any(|g| g.public_key == request.gateway_id) {
                return Err(not_found("gateway"));
            }

            s.next_vip += 1;
            let expires = s
                .lease_expiry
                .unwrap_or_else(|| Utc::now() + Duration::days(1));
            let lease = Lease {
                public_key: request.public_key.clone(),
                gateway_id: request.gateway_id.clone(),
                vip4: format!("10.143.0.{}", s.next_vip),
                vip6: format!("fdad:b10c:a::{}", s.next_vip),
                expires,
            };
            let grant = lease.grant();

            let held = s.leases.entry(request.account_id.clone()).or_default();
            held.retain(|l| !l.matches(&request.public_key, &request.gateway_id));
            held.push(lease);
            s.requested.push(request.clone());
            Ok(grant)
        })
    }

    async fn delete_lease(&self, request: &LeaseRequest) -> ApiResult<()> {
        self.enter(Operation::DeleteLease)?;
        self.with_state(|s| {
            if let Some(held) = s.leases.get_mut(&request.account_id) {
                held.retain(|l| !l.matches(&request.public_key, &request.gateway_id));
            }
            s.deleted.push(request.clone());
        });
        Ok(())
    }
}
