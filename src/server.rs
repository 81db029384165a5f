use crate::prompt::PredictionRequest;
use crate::rag::RagEngine;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub const HEALTH_STATUS: &str = "Brahmin GPT is awake.";
pub const QUESTION_REQUIRED_MESSAGE: &str = "A question is required.";

/// Body of `/api/predict` responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Prediction { prediction: String },
    Error { error: String },
}

/// Router serving the health probe and the prediction endpoint
pub fn router(engine: Arc<RagEngine>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/predict", post(predict))
        .with_state(engine)
        .layer(build_cors_layer(allowed_origins))
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": HEALTH_STATUS }))
}

async fn predict(
    State(engine): State<Arc<RagEngine>>,
    Json(request): Json<PredictionRequest>,
) -> Response {
    if request.question.trim().is_empty() {
        let body = PredictionResponse::Error {
            error: QUESTION_REQUIRED_MESSAGE.to_string(),
        };
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
    }

    info!("Received question ({} chars)", request.question.len());

    match engine.predict(&request).await {
        Ok(prediction) => {
            (StatusCode::OK, Json(PredictionResponse::Prediction { prediction })).into_response()
        }
        Err(err) => {
            // Full detail stays in the server log
            error!("Prediction failed [{:?}]: {}", err.kind(), err);
            let body = PredictionResponse::Error {
                error: err.user_message().to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MISSING_CREDENTIAL_MESSAGE, ORACLE_UNAVAILABLE_MESSAGE};
    use crate::memory::InMemoryIndex;
    use crate::rag::EngineSettings;
    use crate::testing::{FakeCompletion, FakeEmbedder};
    use crate::database::VectorIndex;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const INDEX: &str = "server-test";

    struct Harness {
        app: Router,
        embedder: Arc<FakeEmbedder>,
        completion: Arc<FakeCompletion>,
    }

    async fn harness(
        embedder: FakeEmbedder,
        completion: FakeCompletion,
        api_key_configured: bool,
    ) -> Harness {
        let embedder = Arc::new(embedder);
        let completion = Arc::new(completion);
        let index = Arc::new(InMemoryIndex::new());
        index.ensure_index(INDEX, 26).await.unwrap();

        let engine = Arc::new(RagEngine::new(
            embedder.clone(),
            index,
            completion.clone(),
            EngineSettings {
                index_name: INDEX.to_string(),
                chat_model: "gpt-4o".to_string(),
                top_k: 4,
                embed_batch_size: 8,
                api_key_configured,
            },
        ));
        let origins = vec!["https://brahmin-gpt.example.com".to_string()];

        Harness {
            app: router(engine, &origins),
            embedder,
            completion,
        }
    }

    fn predict_request(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(FakeEmbedder::default(), FakeCompletion::answering("ok"), false).await;

        let response = h
            .app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({ "status": HEALTH_STATUS }));
    }

    #[tokio::test]
    async fn test_predict_success() {
        let h = harness(
            FakeEmbedder::default(),
            FakeCompletion::answering("Your path is bright."),
            true,
        )
        .await;

        let response = h
            .app
            .oneshot(predict_request(
                r#"{"question": "Will I succeed?", "name": "Ravi", "plan": "premium"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!({ "prediction": "Your path is bright." })
        );
        let (prompt, _) = h.completion.last_prompt().unwrap();
        assert!(prompt.user.contains("Name: Ravi"));
        assert!(prompt.user.contains("Plan: premium"));
    }

    #[tokio::test]
    async fn test_missing_credential_response() {
        let h = harness(FakeEmbedder::default(), FakeCompletion::answering("never"), false).await;

        let response = h
            .app
            .oneshot(predict_request(r#"{"question": "Will I succeed?"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            read_json(response).await,
            json!({ "error": MISSING_CREDENTIAL_MESSAGE })
        );
        assert_eq!(h.embedder.calls(), 0);
        assert_eq!(h.completion.calls(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_opaque() {
        for (embedder, completion) in [
            (
                FakeEmbedder::failing("connection reset by 10.0.0.7"),
                FakeCompletion::answering("unused"),
            ),
            (
                FakeEmbedder::default(),
                FakeCompletion::failing("Incorrect API key provided: sk-abc"),
            ),
        ] {
            let h = harness(embedder, completion, true).await;

            let response = h
                .app
                .oneshot(predict_request(r#"{"question": "Is this my year?"}"#))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                read_json(response).await,
                json!({ "error": ORACLE_UNAVAILABLE_MESSAGE })
            );
        }
    }

    #[tokio::test]
    async fn test_missing_question_is_rejected() {
        let h = harness(FakeEmbedder::default(), FakeCompletion::answering("ok"), true).await;

        let response = h
            .app
            .clone()
            .oneshot(predict_request(r#"{"name": "Ravi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = h
            .app
            .oneshot(predict_request(r#"{"question": "   "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            read_json(response).await,
            json!({ "error": QUESTION_REQUIRED_MESSAGE })
        );
        assert_eq!(h.embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_cors_allows_listed_origin_only() {
        let h = harness(FakeEmbedder::default(), FakeCompletion::answering("ok"), true).await;

        let preflight = |origin: &str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/predict")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap()
        };

        let response = h
            .app
            .clone()
            .oneshot(preflight("https://brahmin-gpt.example.com"))
            .await
            .unwrap();
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "https://brahmin-gpt.example.com"
        );

        let response = h
            .app
            .oneshot(preflight("https://evil.example.com"))
            .await
            .unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
