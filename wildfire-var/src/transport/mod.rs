//! Transport HTTP vers les services ArcGIS REST
//!
//! Le trait [`HttpClient`] isole le réseau (client `reqwest` en production,
//! client en mémoire dans les tests). [`fetch_json`] ajoute la politique de
//! retry: 3 tentatives, délai doublé à chaque échec.

pub mod paginate;

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub use paginate::paginate;

/// Erreurs de transport (après épuisement des tentatives pour `fetch_json`)
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connexion, timeout, lecture du corps
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// Statut HTTP >= 400
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Corps de réponse non JSON
    #[error("Invalid JSON from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// Construction du client impossible
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

impl TransportError {
    pub fn request(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Request {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Méthode HTTP d'une requête
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Paramètres encodés (query string ou formulaire)
pub type FormParams = Vec<(String, String)>;

/// Client HTTP asynchrone minimal
pub trait HttpClient: Send + Sync + 'static {
    /// GET avec paramètres en query string
    fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> impl Future<Output = Result<Bytes, TransportError>> + Send;

    /// POST avec paramètres en formulaire
    fn post(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> impl Future<Output = Result<Bytes, TransportError>> + Send;
}

/// Client `reqwest` partagé (pool de connexions)
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Crée un client avec un timeout total par requête
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wildfire-var/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    async fn read(url: &str, response: reqwest::Response) -> Result<Bytes, TransportError> {
        let status = response.status();
        debug!(url = url, status = status.as_u16(), "HTTP response received");

        if !status.is_success() {
            warn!(url = url, status = status.as_u16(), "HTTP error status");
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(|e| {
            warn!(url = url, error = %e, "Failed to read response body");
            TransportError::request(url, e)
        })
    }

    fn send_error(url: &str, e: reqwest::Error) -> TransportError {
        warn!(
            url = url,
            error = %e,
            is_connect = e.is_connect(),
            is_timeout = e.is_timeout(),
            "HTTP request failed"
        );
        TransportError::request(url, e)
    }
}

impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<Bytes, TransportError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| Self::send_error(url, e))?;
        Self::read(url, response).await
    }

    async fn post(&self, url: &str, params: &[(String, String)]) -> Result<Bytes, TransportError> {
        let response = self
            .client
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| Self::send_error(url, e))?;
        Self::read(url, response).await
    }
}

/// Politique de retry: `max_attempts` tentatives, délai initial doublé à chaque échec
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Encode des paramètres JSON en paires clé/valeur
///
/// Les chaînes sont gardées telles quelles, les autres valeurs sont sérialisées
/// (`3338`, `true`, objets JSON).
pub fn form_params(params: &Map<String, Value>) -> FormParams {
    params
        .iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}

/// Envoie une requête et décode la réponse JSON, avec retry
///
/// Toute erreur (réseau, statut, JSON invalide) est retentée; la dernière est propagée.
pub async fn fetch_json<C: HttpClient>(
    client: &C,
    method: Method,
    url: &str,
    params: &Map<String, Value>,
    retry: &RetryPolicy,
) -> Result<Value, TransportError> {
    let form = form_params(params);
    let attempts = retry.max_attempts.max(1);
    let mut delay = retry.base_delay;
    let mut attempt = 0;

    loop {
        attempt += 1;
        let result = match method {
            Method::Get => client.get(url, &form).await,
            Method::Post => client.post(url, &form).await,
        }
        .and_then(|body| {
            serde_json::from_slice::<Value>(&body).map_err(|e| TransportError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            })
        });

        match result {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                warn!(
                    url = url,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Request failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }
}
