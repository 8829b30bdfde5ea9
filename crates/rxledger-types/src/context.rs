use serde::{Deserialize, Serialize};

use crate::id::{OrganizationId, UserId};

/// Explicit acting-user and organization scope for an operation.
///
/// Every store, lifecycle, and funding operation takes a context instead of
/// reading ambient session state; reads outside `organization` behave as if
/// the record did not exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationContext {
    pub organization: OrganizationId,
    pub user: UserId,
}

impl OperationContext {
    pub fn new(organization: OrganizationId, user: UserId) -> Self {
        Self { organization, user }
    }
}
