//! Delegated authorization. Group membership is resolved by an external
//! decision function on every gated request and is never cached or persisted:
//! membership is mutable external state, and a stale grant is a security
//! defect. Absence of a successful, well-formed decision is always "no".

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::identity::Principal;

/// Role flags for a principal, valid for a single request only.
/// A role the decision did not mention is a denied role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct GroupMembership {
    flags: HashMap<String, bool>,
}

impl GroupMembership {
    pub fn new(flags: HashMap<String, bool>) -> Self {
        Self { flags }
    }

    pub fn allows(&self, role: &str) -> bool {
        self.flags.get(role).copied().unwrap_or(false)
    }
}

#[async_trait]
pub trait AuthorizationResolver: Send + Sync {
    /// Ask the decision service for the principal's current memberships.
    async fn resolve(&self, principal: &Principal) -> AppResult<GroupMembership>;
}

/// Production resolver: invokes the configured Lambda decision function with
/// `{"username": ...}` and parses its `{role: bool, ...}` response. Runs on
/// the service's own credentials; caller credentials never reach this path.
pub struct LambdaAuthorizer {
    client: aws_sdk_lambda::Client,
    function_name: String,
}

impl LambdaAuthorizer {
    pub fn new<S: Into<String>>(client: aws_sdk_lambda::Client, function_name: S) -> Self {
        Self { client, function_name: function_name.into() }
    }
}

fn parse_decision(payload: &[u8]) -> AppResult<GroupMembership> {
    let flags: HashMap<String, bool> = serde_json::from_slice(payload)
        .map_err(|_| AppError::forbidden("access denied"))?;
    Ok(GroupMembership::new(flags))
}

#[async_trait]
impl AuthorizationResolver for LambdaAuthorizer {
    async fn resolve(&self, principal: &Principal) -> AppResult<GroupMembership> {
        let request = serde_json::json!({ "username": principal.as_str() });
        let payload = serde_json::to_vec(&request).map_err(|e| AppError::internal(e.to_string()))?;

        let out = self
            .client
            .invoke()
            .function_name(&self.function_name)
            .payload(aws_sdk_lambda::primitives::Blob::new(payload))
            .send()
            .await
            .map_err(|e| {
                warn!("decision function invoke failed: {e}");
                AppError::authz_unavailable("authorization service unavailable")
            })?;

        // The function ran but threw: fail closed.
        if let Some(fn_err) = out.function_error() {
            warn!("decision function error for {}: {}", principal, fn_err);
            return Err(AppError::forbidden("access denied"));
        }

        let bytes = out.payload().map(|b| b.as_ref()).unwrap_or_default();
        parse_decision(bytes).map_err(|e| {
            warn!("decision payload malformed for {}", principal);
            e
        })
    }
}
