use async_trait::async_trait;
use aws_config::BehaviorVersion;
use serde::Deserialize;
use tracing::warn;

use crate::error::{AppError, AppResult};
use super::principal::Principal;

/// Credentials presented by a caller at login. They exist for the duration
/// of the verification call only and are never written to shared state.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialBundle {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

// Manual Debug keeps the secret out of logs.
impl std::fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

impl CredentialBundle {
    /// Structural check, applied before any outbound call is made.
    pub fn validate(&self) -> AppResult<()> {
        if self.access_key_id.trim().is_empty() || self.secret_access_key.trim().is_empty() {
            return Err(AppError::malformed_credentials(
                "accessKeyId and secretAccessKey are required",
            ));
        }
        Ok(())
    }
}

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Verify the presented credentials and derive the caller's principal.
    async fn verify(&self, creds: &CredentialBundle) -> AppResult<Principal>;
}

/// Production verifier: presents the caller's keys to STS and derives the
/// principal from the trailing segment of the returned identity ARN.
pub struct StsCredentialVerifier {
    region: String,
}

impl StsCredentialVerifier {
    pub fn new<S: Into<String>>(region: S) -> Self {
        Self { region: region.into() }
    }
}

#[async_trait]
impl CredentialVerifier for StsCredentialVerifier {
    async fn verify(&self, creds: &CredentialBundle) -> AppResult<Principal> {
        creds.validate()?;

        // A fresh client per call keeps the caller's keys request-scoped:
        // concurrent logins never observe each other's credentials.
        let presented = aws_sdk_sts::config::Credentials::new(
            creds.access_key_id.clone(),
            creds.secret_access_key.clone(),
            creds.session_token.clone(),
            None,
            "pantry-login",
        );
        let cfg = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(presented)
            .region(aws_config::Region::new(self.region.clone()))
            .load()
            .await;
        let sts = aws_sdk_sts::Client::new(&cfg);

        let identity = sts.get_caller_identity().send().await.map_err(|e| {
            // Rejected keys and an unreachable STS collapse into one answer
            // for the caller; the cause lands in the log for operators.
            warn!("sts get-caller-identity failed: {e}");
            AppError::invalid_credentials("invalid credentials")
        })?;

        let arn = identity.arn().unwrap_or_default();
        Principal::from_identity_arn(arn).ok_or_else(|| {
            warn!("sts returned an unusable identity arn");
            AppError::invalid_credentials("invalid credentials")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(id: &str, secret: &str) -> CredentialBundle {
        CredentialBundle {
            access_key_id: id.into(),
            secret_access_key: secret.into(),
            session_token: None,
        }
    }

    #[test]
    fn missing_key_id_is_malformed() {
        let err = bundle("", "shhh").validate().unwrap_err();
        assert!(matches!(err, AppError::MalformedCredentials { .. }));
    }

    #[test]
    fn missing_secret_is_malformed() {
        let err = bundle("AKIAEXAMPLE", "  ").validate().unwrap_err();
        assert!(matches!(err, AppError::MalformedCredentials { .. }));
    }

    #[test]
    fn complete_bundle_validates() {
        assert!(bundle("AKIAEXAMPLE", "shhh").validate().is_ok());
    }

    #[test]
    fn debug_never_prints_the_secret() {
        let s = format!("{:?}", bundle("AKIAEXAMPLE", "super-secret"));
        assert!(!s.contains("super-secret"));
        assert!(s.contains("AKIAEXAMPLE"));
    }

    #[test]
    fn login_body_accepts_wire_field_names() {
        let b: CredentialBundle = serde_json::from_str(
            r#"{"accessKeyId":"AKIA","secretAccessKey":"s","sessionToken":"t"}"#,
        )
        .unwrap();
        assert_eq!(b.access_key_id, "AKIA");
        assert_eq!(b.session_token.as_deref(), Some("t"));
    }
}
