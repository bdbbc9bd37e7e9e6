//! Request plumbing shared by the provider clients.

use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{AiError, Result};

/// POST `body` as JSON and decode the JSON reply. A non-2xx status becomes
/// [`AiError::Api`] with the response body as message; an undecodable 2xx
/// body becomes [`AiError::Parse`].
pub(crate) async fn post_json<B, R>(
    http: &reqwest::Client,
    url: &str,
    headers: HeaderMap,
    timeout: Duration,
    body: &B,
) -> Result<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = http
        .post(url)
        .headers(headers)
        .timeout(timeout)
        .json(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(AiError::Api {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        });
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn call(app: Router) -> Result<Value> {
        let base = serve(app).await;
        post_json(
            &reqwest::Client::new(),
            &format!("{base}/chat"),
            HeaderMap::new(),
            Duration::from_secs(5),
            &json!({"model": "m"}),
        )
        .await
    }

    #[tokio::test]
    async fn success_body_is_decoded() {
        let app = Router::new().route(
            "/chat",
            post(|Json(body): Json<Value>| async move { Json(json!({"echo": body["model"]})) }),
        );
        let reply = call(app).await.unwrap();
        assert_eq!(reply["echo"], "m");
    }

    #[tokio::test]
    async fn throttling_status_is_a_rate_limited_api_error() {
        let app = Router::new().route(
            "/chat",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let err = call(app).await.unwrap_err();
        assert!(err.is_rate_limited(), "{err}");
        match err {
            AiError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "slow down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn garbled_success_body_is_a_parse_error() {
        let app = Router::new().route("/chat", post(|| async { "not json" }));
        let err = call(app).await.unwrap_err();
        assert!(matches!(err, AiError::Parse(_)), "{err}");
    }
}
