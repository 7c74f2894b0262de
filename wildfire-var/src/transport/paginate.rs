//! Pagination des couches ArcGIS (`resultOffset` / `resultRecordCount`)

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::{fetch_json, HttpClient, Method, RetryPolicy, TransportError};

/// Taille de page quand le service ne publie pas `maxRecordCount`
pub const DEFAULT_PAGE_SIZE: u64 = 1000;

/// Lit `maxRecordCount` de la description de la couche
async fn page_size<C: HttpClient>(
    client: &C,
    url: &str,
    params: &Map<String, Value>,
    retry: &RetryPolicy,
) -> u64 {
    let mut probe = Map::new();
    probe.insert("f".into(), json!("json"));
    if let Some(token) = params.get("token") {
        probe.insert("token".into(), token.clone());
    }

    match fetch_json(client, Method::Get, url, &probe, retry).await {
        Ok(info) => info
            .get("maxRecordCount")
            .and_then(Value::as_u64)
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE),
        Err(e) => {
            warn!(url = url, error = %e, "Layer probe failed, using default page size");
            DEFAULT_PAGE_SIZE
        }
    }
}

/// Récupère toutes les features d'une couche, page par page
///
/// Une page sans clé `features` est renvoyée telle quelle (réponse non standard,
/// typiquement `{"error": ...}`). Sinon le résultat vaut `{"features": [...]}`.
pub async fn paginate<C: HttpClient>(
    client: &C,
    url: &str,
    params: &Map<String, Value>,
    retry: &RetryPolicy,
) -> Result<Value, TransportError> {
    let url = url.trim_end_matches('/');
    let page_size = page_size(client, url, params, retry).await;
    let query_url = format!("{url}/query");

    let mut features = Vec::new();
    let mut offset: u64 = 0;

    loop {
        let mut page_params = params.clone();
        page_params.insert("resultOffset".into(), json!(offset));
        page_params.insert("resultRecordCount".into(), json!(page_size));

        let mut page = fetch_json(client, Method::Get, &query_url, &page_params, retry).await?;

        let batch = match page.get_mut("features") {
            Some(Value::Array(batch)) => std::mem::take(batch),
            _ => {
                debug!(url = %query_url, offset = offset, "Page without features, returning as-is");
                return Ok(page);
            }
        };

        let more = page.get("exceededTransferLimit").and_then(Value::as_bool) == Some(true);
        let count = batch.len() as u64;
        features.extend(batch);
        debug!(url = %query_url, offset = offset, count = count, more = more, "Page fetched");

        if !more || count == 0 {
            break;
        }
        offset += count;
    }

    Ok(json!({ "features": features }))
}

#[cfg(test)]
mod tests {
    use super::super::mock::MockHttpClient;
    use super::*;
    use std::time::Duration;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::from_millis(1),
        }
    }

    fn point(i: u64) -> Value {
        json!({"geometry": {"x": i, "y": i}, "attributes": {"ID": i}})
    }

    #[tokio::test]
    async fn test_paginate_follows_transfer_limit() {
        let client = MockHttpClient::default();
        client.push_json("http://svc/0", json!({"maxRecordCount": 2}));
        client.push_json(
            "http://svc/0/query",
            json!({"features": [point(0), point(1)], "exceededTransferLimit": true}),
        );
        client.push_json("http://svc/0/query", json!({"features": [point(2)]}));

        let result = paginate(&client, "http://svc/0/", &Map::new(), &fast())
            .await
            .unwrap();
        assert_eq!(result["features"].as_array().unwrap().len(), 3);

        let calls = client.calls.lock().unwrap();
        let second = &calls[2].1;
        assert!(second.contains(&("resultOffset".to_string(), "2".to_string())));
        assert!(second.contains(&("resultRecordCount".to_string(), "2".to_string())));
    }

    #[tokio::test]
    async fn test_paginate_default_page_size_and_token() {
        let client = MockHttpClient::default();
        client.push_json("http://svc/0", json!({"name": "layer"}));
        client.push_json("http://svc/0/query", json!({"features": []}));

        let mut params = Map::new();
        params.insert("token".into(), json!("secret"));
        let result = paginate(&client, "http://svc/0", &params, &fast())
            .await
            .unwrap();
        assert_eq!(result, json!({"features": []}));

        let calls = client.calls.lock().unwrap();
        assert!(calls[0].1.contains(&("token".to_string(), "secret".to_string())));
        assert!(calls[1]
            .1
            .contains(&("resultRecordCount".to_string(), DEFAULT_PAGE_SIZE.to_string())));
    }

    #[tokio::test]
    async fn test_paginate_returns_error_payload() {
        let client = MockHttpClient::default();
        client.push_json("http://svc/0", json!({"maxRecordCount": 10}));
        client.push_json("http://svc/0/query", json!({"error": {"code": 498}}));

        let result = paginate(&client, "http://svc/0", &Map::new(), &fast())
            .await
            .unwrap();
        assert_eq!(result, json!({"error": {"code": 498}}));
    }
}
