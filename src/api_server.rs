// Axum API Server Module
//
// Purpose: crop prediction + fertilizer lookup over JSON, plus the account
// endpoints the client form logs in with.
// All loaded state is read-only after startup except the credential file.

#[cfg(feature = "api")]
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};

#[cfg(feature = "api")]
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

#[cfg(feature = "api")]
use std::sync::Arc;

#[cfg(feature = "api")]
use std::time::Duration;

#[cfg(feature = "api")]
use serde::de::DeserializeOwned;

#[cfg(feature = "api")]
use serde_json::Value;

#[cfg(feature = "api")]
use crate::classifier::{
    feature_name_warnings, load_feature_names, ClassifierError, CropClassifier,
    TreeEnsembleClassifier,
};

#[cfg(feature = "api")]
use crate::config::ServiceConfig;

#[cfg(feature = "api")]
use crate::credentials::{CredentialError, CredentialStore, ResetOutcome, SignupOutcome};

#[cfg(feature = "api")]
use crate::fertilizer::{FertilizerError, FertilizerTable};

#[cfg(feature = "api")]
use crate::options::FormOptions;

#[cfg(feature = "api")]
use crate::query::{CropQuery, QueryError};

// ============================================================================
// Application State
// ============================================================================

#[cfg(feature = "api")]
#[derive(Clone)]
pub struct AppState {
    /// None when the model failed to load; predictions then report it
    pub classifier: Option<Arc<dyn CropClassifier>>,
    /// None when the table failed to load
    pub fertilizer: Option<Arc<FertilizerTable>>,
    pub options: Arc<FormOptions>,
    pub credentials: Arc<CredentialStore>,
    pub request_timeout: Duration,
}

#[cfg(feature = "api")]
impl AppState {
    /// Assemble state from already-built parts
    pub fn new(
        classifier: Option<Arc<dyn CropClassifier>>,
        fertilizer: Option<FertilizerTable>,
        credentials: CredentialStore,
    ) -> Self {
        let fertilizer = fertilizer.map(Arc::new);
        let options = Arc::new(FormOptions::fallback(fertilizer.as_deref()));

        Self {
            classifier,
            fertilizer,
            options,
            credentials: Arc::new(credentials),
            request_timeout: ServiceConfig::default().request_timeout,
        }
    }

    pub fn with_options(mut self, options: FormOptions) -> Self {
        self.options = Arc::new(options);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Load every artifact named by the config
    ///
    /// Never fails: an artifact that cannot be loaded is logged and the
    /// endpoints depending on it answer with a load error instead.
    pub fn load(config: &ServiceConfig) -> Self {
        let paths = config.artifacts();

        tracing::info!("Loading crop model from {:?}...", paths.crop_model);
        let classifier = match TreeEnsembleClassifier::load(&paths.crop_model, &paths.crop_encoder) {
            Ok(classifier) => Some(Arc::new(classifier) as Arc<dyn CropClassifier>),
            Err(e) => {
                tracing::error!("Crop model failed to load: {:#}", e);
                None
            }
        };

        match load_feature_names(&paths.model_features) {
            Ok(names) => {
                tracing::info!("Model features loaded: {} features", names.len());
                for warning in feature_name_warnings(&names) {
                    tracing::warn!("Model feature compatibility: {}", warning);
                }
            }
            Err(e) => tracing::warn!("Model feature list unavailable: {:#}", e),
        }

        tracing::info!("Loading fertilizer ratios from {:?}...", paths.fertilizer_ratios);
        let fertilizer = match FertilizerTable::load(&paths.fertilizer_ratios) {
            Ok(table) => {
                tracing::info!("Fertilizer ratios loaded for {} crops", table.len());
                Some(table)
            }
            Err(e) => {
                tracing::error!("Fertilizer ratios failed to load: {:#}", e);
                None
            }
        };

        let options = FormOptions::load(&config.dataset_path, fertilizer.as_ref());
        tracing::info!(
            "Form options: {} soil types, {} crops",
            options.soil_types.len(),
            options.crops.len()
        );

        Self::new(classifier, fertilizer, CredentialStore::new(&config.users_file))
            .with_options(options)
            .with_request_timeout(config.request_timeout)
    }
}

// ============================================================================
// Router
// ============================================================================

#[cfg(feature = "api")]
pub fn create_router(state: AppState) -> Router {
    let request_timeout = state.request_timeout;

    Router::new()
        // Liveness
        .route("/", get(index))
        .route("/health", get(health_check))

        // Recommendation endpoints
        .route("/predict", post(predict_crop))
        .route("/fertilizer_recommendation", post(fertilizer_recommendation))
        .route("/api/options", get(form_options))

        // Account endpoints
        .route("/auth/login", post(login))
        .route("/auth/signup", post(signup))
        .route("/auth/reset", post(reset_password))

        // Middleware (applied in reverse order)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::map_response(json_error_bodies))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // Browser form is served from another origin
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

#[cfg(feature = "api")]
async fn index() -> &'static str {
    "Crop recommendation API is running!"
}

#[cfg(feature = "api")]
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "model_loaded": state.classifier.is_some(),
        "fertilizer_loaded": state.fertilizer.is_some(),
    }))
}

/// POST /predict
///
/// Checks, first failure wins: model loaded, numeric fields present and
/// numeric (N, P, K, temperature, humidity, ph, rainfall), soil type present
/// and recognized.
#[cfg(feature = "api")]
async fn predict_crop(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let classifier = state
        .classifier
        .clone()
        .ok_or_else(|| ApiError::Configuration("Model not loaded".to_string()))?;

    let body = parse_json_object(&body)?;
    let query = CropQuery::from_json(&body)?;
    let features = query.feature_vector();

    tracing::debug!("Predicting crop for {:?}", features);

    // Inference runs off the async workers; a panicking model surfaces as a join error
    let label = tokio::task::spawn_blocking(move || classifier.predict(&features))
        .await
        .map_err(|e| ApiError::Internal(format!("Prediction failed: {}", e)))??;

    if label.is_empty() {
        return Err(ApiError::Internal("Model returned an empty crop label".to_string()));
    }

    tracing::info!("Recommended '{}' for {} soil", label, query.soil);

    Ok(Json(serde_json::json!({
        "recommended_crop": label,
        "error": null,
    })))
}

/// POST /fertilizer_recommendation
#[cfg(feature = "api")]
async fn fertilizer_recommendation(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let table = state
        .fertilizer
        .clone()
        .ok_or_else(|| ApiError::Configuration("Fertilizer data not loaded".to_string()))?;

    let body = parse_json_object(&body)?;
    let ratio = table.recommend(&body)?;

    Ok(Json(serde_json::json!({
        "recommended_ratio": ratio,
        "error": null,
    })))
}

#[cfg(feature = "api")]
async fn form_options(State(state): State<AppState>) -> Json<FormOptions> {
    Json(state.options.as_ref().clone())
}

#[cfg(feature = "api")]
async fn login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: LoginRequest = parse_body(&body)?;
    let store = state.credentials.clone();

    let authenticated = tokio::task::spawn_blocking(move || {
        store.verify(&request.username, &request.password)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Login failed: {}", e)))?;

    if !authenticated {
        return Err(ApiError::Unauthorized("Invalid username or password".to_string()));
    }

    Ok(Json(serde_json::json!({
        "authenticated": true,
        "error": null,
    })))
}

#[cfg(feature = "api")]
async fn signup(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let request: LoginRequest = parse_body(&body)?;
    let store = state.credentials.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        store.create(&request.username, &request.password)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Signup failed: {}", e)))??;

    match outcome {
        SignupOutcome::Created => Ok((
            StatusCode::CREATED,
            Json(serde_json::json!({
                "created": true,
                "error": null,
            })),
        )),
        SignupOutcome::AlreadyExists => Err(ApiError::Conflict("Username already exists".to_string())),
    }
}

#[cfg(feature = "api")]
async fn reset_password(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: ResetRequest = parse_body(&body)?;
    let store = state.credentials.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        store.reset(&request.username, &request.new_password)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Password reset failed: {}", e)))??;

    match outcome {
        ResetOutcome::Updated => Ok(Json(serde_json::json!({
            "updated": true,
            "error": null,
        }))),
        ResetOutcome::NotFound => Err(ApiError::NotFound("User does not exist".to_string())),
    }
}

// ============================================================================
// Request Types
// ============================================================================

#[cfg(feature = "api")]
#[derive(serde::Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[cfg(feature = "api")]
#[derive(serde::Deserialize)]
struct ResetRequest {
    username: String,
    new_password: String,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a body that must be a JSON object
#[cfg(feature = "api")]
fn parse_json_object(body: &[u8]) -> Result<Value, ApiError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => Ok(value),
        _ => Err(ApiError::Validation(QueryError::NotAnObject.to_string())),
    }
}

/// Give middleware and extractor rejections the same `{"error": ...}` body
/// as handler errors
#[cfg(feature = "api")]
async fn json_error_bodies(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|value| value.as_bytes().starts_with(b"application/json"));
    if is_json {
        return response;
    }

    match response.status() {
        StatusCode::REQUEST_TIMEOUT => ApiError::Timeout("Request timed out".to_string()).into_response(),
        StatusCode::PAYLOAD_TOO_LARGE => {
            ApiError::PayloadTooLarge("Request body too large".to_string()).into_response()
        }
        _ => response,
    }
}

#[cfg(feature = "api")]
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))
}

// ============================================================================
// Error Handling
// ============================================================================

#[cfg(feature = "api")]
#[derive(Debug)]
enum ApiError {
    /// Artifact missing since startup
    Configuration(String),
    Validation(String),
    NotFound(String),
    Unauthorized(String),
    Conflict(String),
    Timeout(String),
    PayloadTooLarge(String),
    Internal(String),
}

#[cfg(feature = "api")]
impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        // Unknown soil types are client errors like any other bad field
        ApiError::Validation(err.to_string())
    }
}

#[cfg(feature = "api")]
impl From<FertilizerError> for ApiError {
    fn from(err: FertilizerError) -> Self {
        match err {
            FertilizerError::UnknownCrop(_) => ApiError::NotFound(err.to_string()),
            FertilizerError::NotAnObject
            | FertilizerError::MissingCrop
            | FertilizerError::InvalidCrop => ApiError::Validation(err.to_string()),
        }
    }
}

#[cfg(feature = "api")]
impl From<ClassifierError> for ApiError {
    fn from(err: ClassifierError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(feature = "api")]
impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::EmptyField(_) => ApiError::Validation(err.to_string()),
            CredentialError::Io(_) | CredentialError::Encoding(_) => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(feature = "api")]
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Configuration(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Timeout(msg) => {
                tracing::warn!("{}", msg);
                (StatusCode::REQUEST_TIMEOUT, msg)
            }
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
