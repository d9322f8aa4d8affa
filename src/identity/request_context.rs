use super::Principal;
use crate::authz::GroupMembership;

/// Everything a gated handler needs to know about the caller, assembled
/// fresh on each request. Membership is never carried between requests.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub principal: Principal,
    pub groups: GroupMembership,
}
