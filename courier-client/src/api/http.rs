//! HTTP implementation of the backend collaborators.

use async_trait::async_trait;
use courier_core::Attachment;
use courier_types::{
    ApiErrorBody, AttachmentRef, AuthRequest, Credential, HistoryRecord, Message, Peer,
    TokenGrant, UploadReceipt,
};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{ApiError, AttachmentUploader, AuthService, Directory, HistorySource};
use crate::config::{ClientConfig, ConfigError};
use crate::session::SessionContext;

/// Error text the upload view returns for oversized files with a 400.
const FILE_TOO_LARGE: &str = "File too large";

/// REST client for the messaging backend.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base: Url,
}

impl HttpApi {
    /// Build a client for the configured backend.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let base = config.base_url()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client, base })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Rejected(format!("bad endpoint {}: {}", path, e)))
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "backend returned error status");
        Err(classify(status, &body))
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.execute(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn issue_token(&self, path: &str, username: &str, password: &str) -> Result<Credential, ApiError> {
        let request = AuthRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let grant: TokenGrant = self
            .json(self.client.post(self.url(path)?).json(&request))
            .await?;
        Ok(grant.token)
    }
}

/// Map an error status and its body onto the error taxonomy.
fn classify(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized,
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge,
        StatusCode::BAD_REQUEST if message.as_deref() == Some(FILE_TOO_LARGE) => {
            ApiError::PayloadTooLarge
        }
        s if s.is_client_error() => ApiError::Rejected(
            message.unwrap_or_else(|| s.canonical_reason().unwrap_or("request rejected").to_string()),
        ),
        s => ApiError::Unreachable(format!("backend returned {}", s)),
    }
}

fn transport_error(error: reqwest::Error) -> ApiError {
    if error.is_decode() {
        ApiError::Decode(error.to_string())
    } else {
        // Connect failures and timeouts both mean "try again later"
        ApiError::Unreachable(error.to_string())
    }
}

#[async_trait]
impl AuthService for HttpApi {
    async fn register(&self, username: &str, password: &str) -> Result<Credential, ApiError> {
        self.issue_token("/api/register/", username, password).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<Credential, ApiError> {
        self.issue_token("/api/login/", username, password).await
    }
}

#[async_trait]
impl Directory for HttpApi {
    async fn peers(&self, credential: &Credential) -> Result<Vec<Peer>, ApiError> {
        let request = self
            .client
            .get(self.url("/api/users/")?)
            .header(AUTHORIZATION, credential.authorization());
        self.json(request).await
    }
}

#[async_trait]
impl HistorySource for HttpApi {
    async fn fetch_history(
        &self,
        session: &SessionContext,
        peer: &Peer,
    ) -> Result<Vec<Message>, ApiError> {
        let request = self
            .client
            .get(self.url("/api/messages/")?)
            .query(&[("receiver", peer.id.value())])
            .header(AUTHORIZATION, session.credential().authorization());
        let records: Vec<serde_json::Value> = self.json(request).await?;

        Ok(decode_history(records, peer, session.username()))
    }
}

/// Decode history records, skipping the ones that fail validation.
fn decode_history(records: Vec<serde_json::Value>, peer: &Peer, me: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(records.len());
    for value in records {
        let decoded = serde_json::from_value::<HistoryRecord>(value)
            .map_err(|e| e.to_string())
            .and_then(|record| record.into_message(peer, me).map_err(|e| e.to_string()));
        match decoded {
            Ok(message) => messages.push(message),
            Err(reason) => warn!(peer = %peer.id, %reason, "skipping invalid history record"),
        }
    }
    messages
}

#[async_trait]
impl AttachmentUploader for HttpApi {
    async fn upload(
        &self,
        credential: &Credential,
        attachment: &Attachment,
    ) -> Result<AttachmentRef, ApiError> {
        let part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.clone())
            .mime_str(&attachment.content_type)
            .map_err(|e| ApiError::Rejected(format!("invalid content type: {}", e)))?;
        let form = Form::new().part("photo", part);

        let request = self
            .client
            .post(self.url("/api/upload-photo/")?)
            .header(AUTHORIZATION, credential.authorization())
            .multipart(form);
        let receipt: UploadReceipt = self.json(request).await?;

        Ok(receipt.into_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_types::UserId;

    // ===========================================
    // Status Mapping
    // ===========================================

    #[test]
    fn auth_statuses_map_to_unauthorized() {
        assert_eq!(
            classify(StatusCode::UNAUTHORIZED, r#"{"detail":"Invalid token."}"#),
            ApiError::Unauthorized
        );
        assert_eq!(classify(StatusCode::FORBIDDEN, ""), ApiError::Unauthorized);
    }

    #[test]
    fn oversized_uploads_map_to_payload_too_large() {
        assert_eq!(
            classify(StatusCode::PAYLOAD_TOO_LARGE, ""),
            ApiError::PayloadTooLarge
        );
        assert_eq!(
            classify(StatusCode::BAD_REQUEST, r#"{"error":"File too large"}"#),
            ApiError::PayloadTooLarge
        );
    }

    #[test]
    fn other_client_errors_carry_backend_message() {
        assert_eq!(
            classify(
                StatusCode::BAD_REQUEST,
                r#"{"non_field_errors":["Unable to log in with provided credentials."]}"#
            ),
            ApiError::Rejected("Unable to log in with provided credentials.".into())
        );
        assert_eq!(
            classify(StatusCode::BAD_REQUEST, r#"{"error":"Only image files are allowed"}"#),
            ApiError::Rejected("Only image files are allowed".into())
        );
        assert_eq!(
            classify(StatusCode::NOT_FOUND, "<html>"),
            ApiError::Rejected("Not Found".into())
        );
    }

    #[test]
    fn server_errors_are_unreachable() {
        assert!(matches!(
            classify(StatusCode::BAD_GATEWAY, ""),
            ApiError::Unreachable(_)
        ));
        assert!(matches!(
            classify(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"boom"}"#),
            ApiError::Unreachable(_)
        ));
    }

    // ===========================================
    // History Decoding
    // ===========================================

    #[test]
    fn invalid_history_records_are_skipped() {
        let bob = Peer::new(UserId::new(2), "bob");
        let records: Vec<serde_json::Value> = serde_json::from_str(
            r#"[
                {"id": 1, "sender": "bob", "content": "hi", "timestamp": "2024-05-01T12:00:00Z"},
                {"id": 2, "sender": "bob", "content": "", "timestamp": "2024-05-01T12:00:01Z"},
                {"id": 3, "sender": "alice", "content": "yo", "timestamp": "not a time"},
                {"id": 4, "content": "no sender", "timestamp": "2024-05-01T12:00:02Z"},
                {"id": 5, "sender": "alice", "content": "back", "timestamp": "2024-05-01T12:00:03Z"}
            ]"#,
        )
        .unwrap();

        let messages = decode_history(records, &bob, "alice");

        let bodies: Vec<_> = messages.iter().filter_map(|m| m.body.as_deref()).collect();
        assert_eq!(bodies, vec!["hi", "back"]);
        assert!(messages.iter().all(|m| m.peer_id == bob.id));
    }

    // ===========================================
    // Network Failures
    // ===========================================

    #[tokio::test]
    async fn unreachable_backend_maps_to_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ClientConfig::default().with_base_url(format!("http://127.0.0.1:{}", port));
        let api = HttpApi::new(&config).unwrap();

        let result = api.peers(&Credential::new("t")).await;
        assert!(matches!(result, Err(ApiError::Unreachable(_))));
    }
}
