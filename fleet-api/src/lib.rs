//! Collaborator contracts consumed by the pricing core and its request
//! handlers: session authority, device authentication, rate limiting, and
//! the device directory. Implementations live with the surrounding service;
//! this crate carries only the interfaces.

use std::collections::HashSet;

use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Owner,
    Operator,
    Device,
}

/// Authenticated caller as established by the session collaborator.
#[derive(Clone, Debug)]
pub struct Principal {
    pub subject: String,
    pub role: Role,
}

impl Principal {
    pub fn new(subject: impl Into<String>, role: Role) -> Self {
        Self {
            subject: subject.into(),
            role,
        }
    }
}

/// Validates a session token and yields the caller's principal.
pub trait SessionAuthority: Send + Sync {
    fn authenticate(&self, token: &str) -> ApiResult<Principal>;
}

/// Owner-level gate for pricing-management calls.
pub fn require_owner(principal: &Principal) -> ApiResult<()> {
    match principal.role {
        Role::Owner => Ok(()),
        _ => Err(ApiError::Forbidden),
    }
}

/// Validates a device identity/credential pair before device-initiated calls.
pub trait DeviceAuthenticator: Send + Sync {
    fn verify(&self, device_id: &str, api_key: &str) -> ApiResult<()>;
}

#[derive(Clone, Copy, Debug)]
pub struct RateDecision {
    pub allowed: bool,
    pub wait_ms: u64,
}

/// Pass/fail gate in front of device-facing endpoints. Callers must reject
/// the request before reaching the core when `allowed` is false.
pub trait RateLimiter: Send + Sync {
    fn check(&self, device_id: &str) -> RateDecision;
}

/// Registry lookup used to reject schedules for unknown device scopes.
pub trait DeviceDirectory: Send + Sync {
    fn device_exists(&self, device_id: &str) -> ApiResult<bool>;
}

/// Immutable directory snapshot; enough for services that load the registry
/// at startup, and for tests.
#[derive(Debug, Default, Clone)]
pub struct StaticDeviceDirectory {
    devices: HashSet<String>,
}

impl StaticDeviceDirectory {
    pub fn new<I>(devices: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            devices: devices.into_iter().collect(),
        }
    }
}

impl DeviceDirectory for StaticDeviceDirectory {
    fn device_exists(&self, device_id: &str) -> ApiResult<bool> {
        Ok(self.devices.contains(device_id))
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("caller is not authenticated")]
    Unauthorized,
    #[error("caller lacks the required role")]
    Forbidden,
    #[error("rate limited, retry in {wait_ms}ms")]
    RateLimited { wait_ms: u64 },
    #[error("collaborator failure: {source}")]
    Failure {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_gate_rejects_other_roles() {
        assert!(require_owner(&Principal::new("o1", Role::Owner)).is_ok());
        assert!(matches!(
            require_owner(&Principal::new("d1", Role::Device)),
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            require_owner(&Principal::new("op1", Role::Operator)),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn static_directory_answers_membership() {
        let directory = StaticDeviceDirectory::new(vec!["OIL-0001".to_string()]);
        assert!(directory.device_exists("OIL-0001").unwrap());
        assert!(!directory.device_exists("OIL-0002").unwrap());
    }

    struct SingleTokenSession;

    impl SessionAuthority for SingleTokenSession {
        fn authenticate(&self, token: &str) -> ApiResult<Principal> {
            match token {
                "owner-token" => Ok(Principal::new("o1", Role::Owner)),
                _ => Err(ApiError::Unauthorized),
            }
        }
    }

    struct ClosedGate;

    impl RateLimiter for ClosedGate {
        fn check(&self, _device_id: &str) -> RateDecision {
            RateDecision {
                allowed: false,
                wait_ms: 250,
            }
        }
    }

    struct KeyedAuthenticator;

    impl DeviceAuthenticator for KeyedAuthenticator {
        fn verify(&self, device_id: &str, api_key: &str) -> ApiResult<()> {
            if device_id == "OIL-0001" && api_key == "k1" {
                Ok(())
            } else {
                Err(ApiError::Unauthorized)
            }
        }
    }

    // The handler-side gate sequence: session, role, then the rate limiter
    // before anything device-facing reaches the core.
    #[test]
    fn gate_sequence_composes() {
        let session = SingleTokenSession;
        let principal = session.authenticate("owner-token").unwrap();
        assert!(require_owner(&principal).is_ok());
        assert!(matches!(
            session.authenticate("stale"),
            Err(ApiError::Unauthorized)
        ));

        let authenticator = KeyedAuthenticator;
        assert!(authenticator.verify("OIL-0001", "k1").is_ok());
        assert!(authenticator.verify("OIL-0001", "wrong").is_err());

        let limiter = ClosedGate;
        let decision = limiter.check("OIL-0001");
        assert!(!decision.allowed);
        assert_eq!(decision.wait_ms, 250);
    }
}
