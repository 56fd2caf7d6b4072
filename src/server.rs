use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::{FeatureVector, InputError, DEFAULT_SCORE, FEATURE_LABELS};
use crate::page::{self, FIELD_NAMES};
use crate::predictor::{load_classifier, load_regressor, BoostedClassifier, RandomForestRegressor};
use crate::stress::compute_prediction;

/// Upper bound on one page render, dataset read included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AppState {
    pub config: AppConfig,
    pub regressor: RandomForestRegressor,
    pub classifier: BoostedClassifier,
}

impl AppState {
    /// Both artifacts are mandatory, so any load failure aborts startup.
    pub fn load(config: AppConfig) -> anyhow::Result<Self> {
        let regressor = load_regressor(&config.regressor_path).context("failed to load regression model")?;
        let classifier =
            load_classifier(&config.classifier_path).context("failed to load classification model")?;
        Ok(Self {
            config,
            regressor,
            classifier,
        })
    }
}

/// Missing fields fall back to the slider default.
pub fn parse_inputs(params: &HashMap<String, String>) -> Result<FeatureVector, InputError> {
    let mut values = [i64::from(DEFAULT_SCORE); 4];
    for ((slot, name), label) in values.iter_mut().zip(FIELD_NAMES).zip(FEATURE_LABELS) {
        if let Some(raw) = params.get(name) {
            *slot = raw.trim().parse().map_err(|_| InputError::NotANumber {
                field: label,
                raw: raw.clone(),
            })?;
        }
    }
    FeatureVector::new(values[0], values[1], values[2], values[3])
}

/// Renders the page for one set of query parameters. The dataset is re-read
/// on every call so edits to the CSV show up on refresh.
pub fn render_index(state: &AppState, params: &HashMap<String, String>) -> Result<String, InputError> {
    let inputs = parse_inputs(params)?;

    let prediction = params.contains_key("predict").then(|| {
        compute_prediction(&inputs, &state.regressor, &state.classifier).map_err(|err| {
            tracing::error!(error = %err, "prediction failed");
            err.to_string()
        })
    });

    let dashboard = page::load_dashboard(&state.config.dataset_path, &state.regressor);
    if let Err(err) = &dashboard {
        tracing::warn!(
            kind = err.kind(),
            error = %err,
            path = %state.config.dataset_path.display(),
            "dashboard unavailable"
        );
    }

    Ok(page::render_page(&inputs, prediction.as_ref(), &dashboard, Utc::now()))
}

async fn index(State(state): State<Arc<AppState>>, Query(params): Query<HashMap<String, String>>) -> Response {
    let request_id = Uuid::new_v4();
    let rendered = tokio::task::spawn_blocking(move || render_index(&state, &params)).await;

    match rendered {
        Ok(Ok(html)) => {
            tracing::info!(%request_id, status = 200, "page served");
            Html(html).into_response()
        }
        Ok(Err(err)) => {
            tracing::info!(%request_id, status = 400, error = %err, "rejected inputs");
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        Err(err) => {
            tracing::error!(%request_id, error = %err, "render task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/index.html", get(index))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("dashboard running at http://{}", listener.local_addr()?);
    axum::serve(listener, router(Arc::new(state)))
        .await
        .context("server error")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tower::ServiceExt;

    use super::*;
    use crate::page::DATASET_WARNING;
    use crate::seed::{demo_classifier, demo_regressor};

    fn state_without_dataset() -> AppState {
        let missing = std::env::temp_dir().join(format!("{}.csv", Uuid::new_v4()));
        AppState {
            config: AppConfig {
                regressor_path: PathBuf::from("unused"),
                classifier_path: PathBuf::from("unused"),
                dataset_path: missing,
            },
            regressor: demo_regressor(),
            classifier: demo_classifier(),
        }
    }

    async fn get_page(method: &str, uri: &str) -> (StatusCode, String) {
        let app = router(Arc::new(state_without_dataset()));
        let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn spawn_server() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(state_without_dataset()))).await.unwrap();
        });
        addr
    }

    #[test]
    fn missing_inputs_default_to_three() {
        let params = HashMap::from([("academic".to_string(), "1".to_string())]);
        let inputs = parse_inputs(&params).unwrap();
        assert_eq!(inputs.values(), [3, 1, 3, 3]);
    }

    #[tokio::test]
    async fn out_of_range_input_is_bad_request() {
        let (status, body) = get_page("GET", "/?sleep=9").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Sleep Quality"));
    }

    #[tokio::test]
    async fn non_numeric_input_is_bad_request() {
        let (status, _) = get_page("GET", "/?study=lots").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn query_values_are_percent_decoded() {
        let (status, body) = get_page("GET", "/?sleep=%35&academic=%205").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"name="sleep" min="1" max="5" step="1" value="5""#));
        assert!(body.contains(r#"name="academic" min="1" max="5" step="1" value="5""#));
    }

    #[tokio::test]
    async fn unknown_path_and_method_are_rejected() {
        assert_eq!(get_page("GET", "/admin").await.0, StatusCode::NOT_FOUND);
        assert_eq!(get_page("POST", "/").await.0, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn prediction_works_without_dataset() {
        let (status, body) = get_page("GET", "/?predict=1").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("3.00 / 5"));
        assert!(body.contains("Moderate Stress"));
        assert_eq!(body.matches(DATASET_WARNING).count(), 1);
        assert_eq!(body.matches("<svg").count(), 0);
    }

    #[tokio::test]
    async fn page_without_predict_has_no_result_panel() {
        let (status, body) = get_page("GET", "/index.html").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("Predicted Stress Score"));
    }

    #[tokio::test]
    async fn serves_page_over_tcp() {
        let addr = spawn_server().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(
                b"GET /?sleep=5&academic=5&study=5&extracurricular=5&predict=1 HTTP/1.1\r\n\
                  Host: localhost\r\nConnection: close\r\n\r\n",
            )
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        assert!(raw.starts_with("HTTP/1.1 200 OK"));
        assert!(raw.contains("Predict Stress"));
        assert!(raw.contains("Stress Interpretation"));
    }

    #[tokio::test]
    async fn oversized_request_line_is_refused() {
        let addr = spawn_server().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let pad = "a".repeat(100 * 1024);
        let request = format!("GET /?pad={pad} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();

        let raw = String::from_utf8_lossy(&raw);
        assert!(!raw.starts_with("HTTP/1.1 200"));
        assert!(raw.starts_with("HTTP/1.1 4"), "unexpected response: {raw:.80}");
    }
}
