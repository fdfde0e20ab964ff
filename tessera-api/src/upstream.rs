//! Client for the legacy record service.
//!
//! One [`LegacyClient`] owns the process-wide connection pool; each request
//! derives a cheap handle bound to its caller's credential with
//! [`LegacyClient::with_credential`]. Every call goes through
//! [`with_retry`] under the client's [`RetryPolicy`].

use std::sync::Arc;

use reqwest::{header::AUTHORIZATION, StatusCode};
use serde::de::DeserializeOwned;
use tessera_core::{
    EntityKind, LegacyCustomer, LegacyCustomerOrders, LegacyCustomerRows, LegacyOrder,
    LegacyRecord, RelationRef, UpstreamError, UpstreamResult,
};

use crate::error::{ApiError, ApiResult};
use crate::retry::{with_retry, RetryPolicy};

#[derive(Clone)]
pub struct LegacyClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    policy: RetryPolicy,
    credential: Option<Arc<str>>,
}

impl std::fmt::Debug for LegacyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyClient")
            .field("base_url", &self.base_url)
            .field("policy", &self.policy)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl LegacyClient {
    /// Build the shared client. Carries no credential.
    pub fn new(base_url: &str, policy: RetryPolicy) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tessera-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::internal_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            policy,
            credential: None,
        })
    }

    /// Handle sharing this client's pool whose calls all carry `credential`
    /// verbatim as the `authorization` header. `None` sends no header.
    pub fn with_credential(&self, credential: Option<&str>) -> Self {
        Self {
            credential: credential.map(Arc::from),
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// `GET /{collection}/{id}`. A 404 becomes [`UpstreamError::NotFound`].
    pub async fn fetch_one<R>(&self, id: &str) -> UpstreamResult<R>
    where
        R: LegacyRecord + DeserializeOwned,
    {
        let path = format!("/{}/{}", R::KIND.collection(), urlencoding::encode(id));
        let operation = match R::KIND {
            EntityKind::Customer => "fetch_customer",
            EntityKind::Order => "fetch_order",
        };
        self.get_json(operation, &path, Some((R::KIND, id))).await
    }

    pub async fn fetch_customer(&self, id: &str) -> UpstreamResult<LegacyCustomer> {
        self.fetch_one(id).await
    }

    pub async fn fetch_order(&self, id: &str) -> UpstreamResult<LegacyOrder> {
        self.fetch_one(id).await
    }

    /// `GET /customers?ids=a,b,c`. Rows come back in whatever order the
    /// service chooses and unknown ids are simply missing.
    pub async fn fetch_customers_batch(&self, ids: &[String]) -> UpstreamResult<Vec<LegacyCustomer>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids
            .iter()
            .map(|id| urlencoding::encode(id))
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/{}?ids={}", EntityKind::Customer.collection(), joined);

        let body: LegacyCustomerRows = self.get_json("fetch_customers_batch", &path, None).await?;
        Ok(body.rows)
    }

    /// `GET /customers/{id}/orders`, reduced to relation references.
    pub async fn fetch_customer_orders(&self, customer_id: &str) -> UpstreamResult<Vec<RelationRef>> {
        let path = format!(
            "/{}/{}/{}",
            EntityKind::Customer.collection(),
            urlencoding::encode(customer_id),
            EntityKind::Order.collection()
        );

        let body: LegacyCustomerOrders = self
            .get_json(
                "fetch_customer_orders",
                &path,
                Some((EntityKind::Customer, customer_id)),
            )
            .await?;
        Ok(body.orders.into_iter().map(RelationRef::from).collect())
    }

    /// `GET /health`, a single attempt under the per-attempt deadline.
    /// Used by the readiness probe, so it never retries.
    pub async fn ping(&self) -> UpstreamResult<()> {
        let path = "/health";
        let url = format!("{}{}", self.base_url, path);
        let deadline = self.policy.attempt_timeout;

        match tokio::time::timeout(deadline, self.attempt::<serde_json::Value>(&url, path, None)).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(UpstreamError::Timeout {
                path: path.to_string(),
                after_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    // ========================================================================
    // Transport
    // ========================================================================

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        subject: Option<(EntityKind, &str)>,
    ) -> UpstreamResult<T> {
        let url = format!("{}{}", self.base_url, path);
        with_retry(&self.policy, operation, path, || {
            self.attempt(&url, path, subject)
        })
        .await
    }

    /// One attempt, no retry.
    async fn attempt<T: DeserializeOwned>(
        &self,
        url: &str,
        path: &str,
        subject: Option<(EntityKind, &str)>,
    ) -> UpstreamResult<T> {
        let mut request = self.http.get(url);
        if let Some(credential) = &self.credential {
            request = request.header(AUTHORIZATION, credential.as_ref());
        }

        let response = request.send().await.map_err(|e| UpstreamError::Transport {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some((kind, id)) = subject {
                return Err(UpstreamError::NotFound {
                    kind,
                    id: id.to_string(),
                });
            }
        }
        if status.is_server_error() {
            return Err(UpstreamError::Server {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        if !status.is_success() {
            return Err(UpstreamError::Rejected {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_decode() {
                UpstreamError::Decode {
                    path: path.to_string(),
                    reason: e.to_string(),
                }
            } else {
                UpstreamError::Transport {
                    path: path.to_string(),
                    reason: e.to_string(),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_credential_keeps_pool_and_policy() -> ApiResult<()> {
        let shared = LegacyClient::new("http://legacy:4001/", RetryPolicy::default())?;
        assert_eq!(shared.base_url(), "http://legacy:4001");
        assert_eq!(shared.credential(), None);

        let scoped = shared.with_credential(Some("Bearer abc"));
        assert_eq!(scoped.credential(), Some("Bearer abc"));
        assert_eq!(scoped.base_url(), shared.base_url());
        assert_eq!(scoped.policy(), shared.policy());
        assert_eq!(shared.credential(), None);
        Ok(())
    }

    #[test]
    fn test_debug_redacts_credential() -> ApiResult<()> {
        let client = LegacyClient::new("http://legacy", RetryPolicy::default())?
            .with_credential(Some("Bearer secret"));
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_batch_skips_network() -> ApiResult<()> {
        // Nothing listens on port 9; a network call would fail.
        let client = LegacyClient::new("http://127.0.0.1:9", RetryPolicy::default())?;
        let rows = client.fetch_customers_batch(&[]).await?;
        assert!(rows.is_empty());
        Ok(())
    }
}
