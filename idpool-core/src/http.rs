//! HTTP client for the identity-exchange service.
//!
//! Speaks the identity-pool JSON protocol: every call is a `POST` to the
//! service root with the operation named in the `X-Amz-Target` header.
//! `GetId` and `GetCredentialsForIdentity` are unsigned calls, so no
//! long-lived credentials are needed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::credentials::{Credentials, RawCredentials};
use crate::exchange::{ExchangeError, IdentityExchange};
use crate::model::{IdentityPoolConfig, LoginsMap, OwnerScope};

const TARGET_PREFIX: &str = "AWSCognitoIdentityService";
const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Default service endpoint for `region`.
pub fn default_endpoint(region: &str) -> String {
    format!("https://cognito-identity.{}.amazonaws.com", region)
}

/// User agent reported to the service for `owner`.
pub fn user_agent(owner: &OwnerScope) -> String {
    format!(
        "idpool/{} {}/{}",
        env!("CARGO_PKG_VERSION"),
        owner.key(),
        owner.version()
    )
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetIdRequest<'a> {
    identity_pool_id: &'a str,
    #[serde(skip_serializing_if = "no_logins")]
    logins: &'a LoginsMap,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetIdResponse {
    identity_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetCredentialsRequest<'a> {
    identity_id: &'a str,
    #[serde(skip_serializing_if = "no_logins")]
    logins: &'a LoginsMap,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetCredentialsResponse {
    identity_id: Option<String>,
    credentials: Option<WireCredentials>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireCredentials {
    access_key_id: Option<String>,
    secret_key: Option<String>,
    session_token: Option<String>,
    /// Seconds since the epoch, possibly fractional.
    expiration: Option<f64>,
}

impl From<WireCredentials> for RawCredentials {
    fn from(wire: WireCredentials) -> Self {
        RawCredentials {
            access_key_id: wire.access_key_id,
            secret_key: wire.secret_key,
            session_token: wire.session_token,
            expiration: wire
                .expiration
                .and_then(|secs| DateTime::<Utc>::from_timestamp_millis((secs * 1000.0) as i64)),
        }
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(rename = "__type")]
    kind: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

fn no_logins(logins: &&LoginsMap) -> bool {
    logins.is_empty()
}

/// [`IdentityExchange`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpIdentityExchange {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpIdentityExchange {
    /// Client for the default endpoint of the pool's region.
    pub fn new(pool: &IdentityPoolConfig, owner: &OwnerScope) -> Result<Self, ExchangeError> {
        Self::with_endpoint(&default_endpoint(&pool.region), owner)
    }

    /// Client for a custom endpoint.
    pub fn with_endpoint(endpoint: &str, owner: &OwnerScope) -> Result<Self, ExchangeError> {
        let endpoint = Url::parse(endpoint).map_err(|e| ExchangeError::Configuration {
            message: format!("invalid endpoint {:?}: {}", endpoint, e),
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ExchangeError::Configuration {
                message: format!("unsupported endpoint scheme: {}", endpoint.scheme()),
            });
        }

        let http = reqwest::Client::builder()
            .user_agent(user_agent(owner))
            .build()
            .map_err(|e| ExchangeError::Configuration {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<Req, Resp>(&self, operation: &str, request: &Req) -> Result<Resp, ExchangeError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_vec(request).map_err(|e| ExchangeError::Configuration {
            message: format!("failed to encode {} request: {}", operation, e),
        })?;

        tracing::debug!("Calling {} at {}", operation, self.endpoint);
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, operation))
            .body(body)
            .send()
            .await
            .map_err(|e| ExchangeError::Network {
                message: format!("{} request failed: {}", operation, e),
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| ExchangeError::Network {
            message: format!("failed to read {} response: {}", operation, e),
        })?;

        if !status.is_success() {
            return Err(service_error(status, &bytes));
        }

        serde_json::from_slice(&bytes).map_err(|e| ExchangeError::MalformedResponse {
            message: format!("invalid {} response: {}", operation, e),
        })
    }
}

fn service_error(status: reqwest::StatusCode, body: &[u8]) -> ExchangeError {
    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            kind: Some(kind),
            message,
        }) => ExchangeError::Service {
            // Types may be namespaced, e.g. "com.example#NotAuthorizedException".
            kind: kind.rsplit('#').next().unwrap_or(&kind).to_string(),
            message: message.unwrap_or_else(|| status.to_string()),
        },
        _ => ExchangeError::Service {
            kind: format!("HTTP {}", status.as_u16()),
            message: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

#[async_trait]
impl IdentityExchange for HttpIdentityExchange {
    async fn get_id(&self, pool_id: &str, logins: &LoginsMap) -> Result<String, ExchangeError> {
        let request = GetIdRequest {
            identity_pool_id: pool_id,
            logins,
        };
        let response: GetIdResponse = self.call("GetId", &request).await?;

        response
            .identity_id
            .ok_or_else(|| ExchangeError::MalformedResponse {
                message: "identity id was unexpectedly missing from GetId response".to_string(),
            })
    }

    async fn get_credentials_for_identity(
        &self,
        identity_id: &str,
        logins: &LoginsMap,
    ) -> Result<(Credentials, String), ExchangeError> {
        let request = GetCredentialsRequest {
            identity_id,
            logins,
        };
        let response: GetCredentialsResponse =
            self.call("GetCredentialsForIdentity", &request).await?;

        let (Some(wire_credentials), Some(identity_id)) =
            (response.credentials, response.identity_id)
        else {
            return Err(ExchangeError::MalformedResponse {
                message: "credentials were unexpectedly missing from GetCredentialsForIdentity response"
                    .to_string(),
            });
        };

        let credentials = Credentials::try_from(RawCredentials::from(wire_credentials))?;
        Ok((credentials, identity_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn owner() -> OwnerScope {
        OwnerScope::new("testOwner", "2.1.0").unwrap()
    }

    fn logins() -> LoginsMap {
        LoginsMap::from([("accounts.google.com".to_string(), "id-token".to_string())])
    }

    #[test]
    fn test_default_endpoint_and_user_agent() {
        assert_eq!(
            default_endpoint("eu-west-1"),
            "https://cognito-identity.eu-west-1.amazonaws.com"
        );
        let agent = user_agent(&owner());
        assert!(agent.starts_with("idpool/"));
        assert!(agent.ends_with(" testOwner/2.1.0"));
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        assert!(matches!(
            HttpIdentityExchange::with_endpoint("not a url", &owner()),
            Err(ExchangeError::Configuration { .. })
        ));
        assert!(matches!(
            HttpIdentityExchange::with_endpoint("ftp://example.com", &owner()),
            Err(ExchangeError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("x-amz-target", "AWSCognitoIdentityService.GetId"))
            .and(header("content-type", JSON_CONTENT_TYPE))
            .and(body_string_contains("\"IdentityPoolId\":\"us-east-1:pool\""))
            .and(body_string_contains("\"accounts.google.com\":\"id-token\""))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "IdentityId": "us-east-1:identity" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpIdentityExchange::with_endpoint(&server.uri(), &owner()).unwrap();
        let identity_id = client.get_id("us-east-1:pool", &logins()).await.unwrap();
        assert_eq!(identity_id, "us-east-1:identity");
    }

    #[tokio::test]
    async fn test_get_id_missing_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = HttpIdentityExchange::with_endpoint(&server.uri(), &owner()).unwrap();
        let result = client.get_id("us-east-1:pool", &LoginsMap::new()).await;
        assert!(matches!(result, Err(ExchangeError::MalformedResponse { .. })));
    }

    #[tokio::test]
    async fn test_get_credentials_for_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header(
                "x-amz-target",
                "AWSCognitoIdentityService.GetCredentialsForIdentity",
            ))
            .and(body_string_contains("\"IdentityId\":\"us-east-1:old\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "IdentityId": "us-east-1:new",
                "Credentials": {
                    "AccessKeyId": "ASIAEXAMPLE",
                    "SecretKey": "secret-key",
                    "SessionToken": "session-token",
                    "Expiration": 1_900_000_000.5
                }
            })))
            .mount(&server)
            .await;

        let client = HttpIdentityExchange::with_endpoint(&server.uri(), &owner()).unwrap();
        let (credentials, identity_id) = client
            .get_credentials_for_identity("us-east-1:old", &logins())
            .await
            .unwrap();

        assert_eq!(identity_id, "us-east-1:new");
        assert_eq!(credentials.access_key_id(), "ASIAEXAMPLE");
        assert_eq!(credentials.secret_access_key(), "secret-key");
        assert_eq!(credentials.session_token(), "session-token");
        assert_eq!(credentials.expiration().timestamp_millis(), 1_900_000_000_500);
    }

    #[tokio::test]
    async fn test_get_credentials_missing_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "IdentityId": "us-east-1:new",
                "Credentials": { "AccessKeyId": "ASIAEXAMPLE" }
            })))
            .mount(&server)
            .await;

        let client = HttpIdentityExchange::with_endpoint(&server.uri(), &owner()).unwrap();
        let result = client
            .get_credentials_for_identity("us-east-1:old", &logins())
            .await;
        assert!(matches!(result, Err(ExchangeError::MalformedResponse { .. })));
    }

    #[tokio::test]
    async fn test_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "__type": "com.amazonaws.cognito.identity#NotAuthorizedException",
                "message": "Invalid login token. Token expired"
            })))
            .mount(&server)
            .await;

        let client = HttpIdentityExchange::with_endpoint(&server.uri(), &owner()).unwrap();
        let err = client.get_id("us-east-1:pool", &logins()).await.unwrap_err();

        assert!(err.is_not_authorized());
        assert_eq!(
            err.to_string(),
            "NotAuthorizedException: Invalid login token. Token expired"
        );
    }

    #[tokio::test]
    async fn test_unstructured_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let client = HttpIdentityExchange::with_endpoint(&server.uri(), &owner()).unwrap();
        let err = client.get_id("us-east-1:pool", &logins()).await.unwrap_err();

        match err {
            ExchangeError::Service { kind, message } => {
                assert_eq!(kind, "HTTP 503");
                assert_eq!(message, "unavailable");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
