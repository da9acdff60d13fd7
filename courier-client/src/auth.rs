//! Sign-in helpers producing a [`SessionContext`].

use tracing::info;

use crate::api::{ApiError, AuthService};
use crate::error::ClientError;
use crate::session::SessionContext;

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";

/// Exchange username/password for a session.
pub async fn login<A>(auth: &A, username: &str, password: &str) -> Result<SessionContext, ClientError>
where
    A: AuthService + ?Sized,
{
    if username.is_empty() || password.is_empty() {
        return Err(ClientError::AuthFailed(LOGIN_FAILED.into()));
    }
    let credential = auth
        .login(username, password)
        .await
        .map_err(|e| auth_failure(e, LOGIN_FAILED))?;

    info!(%username, "logged in");
    Ok(SessionContext::new(credential, username))
}

/// Create an account and sign in as it.
pub async fn register<A>(
    auth: &A,
    username: &str,
    password: &str,
) -> Result<SessionContext, ClientError>
where
    A: AuthService + ?Sized,
{
    if username.is_empty() || password.is_empty() {
        return Err(ClientError::AuthFailed(REGISTRATION_FAILED.into()));
    }
    let credential = auth
        .register(username, password)
        .await
        .map_err(|e| auth_failure(e, REGISTRATION_FAILED))?;

    info!(%username, "registered");
    Ok(SessionContext::new(credential, username))
}

/// Backend text when there is some, the fixed form message otherwise.
fn auth_failure(error: ApiError, fallback: &str) -> ClientError {
    match error {
        ApiError::Unreachable(reason) => ClientError::Unreachable(reason),
        ApiError::Rejected(message) if !message.is_empty() => ClientError::AuthFailed(message),
        _ => ClientError::AuthFailed(fallback.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApi;

    #[tokio::test]
    async fn login_builds_session() {
        let api = MockApi::new();
        api.add_account("alice", "pw");

        let session = login(&api, "alice", "pw").await.unwrap();

        assert_eq!(session.username(), "alice");
        assert!(!session.credential().is_empty());
    }

    #[tokio::test]
    async fn login_failure_carries_backend_message() {
        let api = MockApi::new();
        api.add_account("alice", "pw");

        let error = login(&api, "alice", "nope").await.unwrap_err();
        assert!(matches!(
            error,
            ClientError::AuthFailed(m) if m == "Unable to log in with provided credentials."
        ));
    }

    #[tokio::test]
    async fn empty_fields_fail_without_a_request() {
        let api = MockApi::new();
        assert!(matches!(
            login(&api, "", "pw").await,
            Err(ClientError::AuthFailed(m)) if m == "Login failed"
        ));
        assert!(matches!(
            register(&api, "bob", "").await,
            Err(ClientError::AuthFailed(m)) if m == "Registration failed"
        ));
    }

    #[tokio::test]
    async fn duplicate_registration_fails() {
        let api = MockApi::new();
        register(&api, "bob", "pw").await.unwrap();

        let error = register(&api, "bob", "pw").await.unwrap_err();
        assert!(matches!(error, ClientError::AuthFailed(m) if m == "Username already exists"));
    }

    #[test]
    fn unauthorized_maps_to_fixed_message() {
        let error = auth_failure(ApiError::Unauthorized, LOGIN_FAILED);
        assert!(matches!(error, ClientError::AuthFailed(m) if m == "Login failed"));
    }

    #[test]
    fn unreachable_is_not_an_auth_failure() {
        let error = auth_failure(ApiError::Unreachable("refused".into()), LOGIN_FAILED);
        assert!(matches!(error, ClientError::Unreachable(_)));
    }
}
