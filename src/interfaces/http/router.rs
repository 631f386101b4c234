//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::{DashboardRenderer, IdentityService, PageController, PredictionService};
use crate::domain::UserStore;
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::middleware::{require_auth, session_middleware, SessionLayerState};
use crate::interfaces::http::modules::{
    auth, dashboard, health, metrics, pages, predict, request_id,
};

/// Everything the HTTP layer needs. Axum hands each handler its own slice
/// through `FromRef`.
#[derive(Clone)]
pub struct AppServices {
    pub identity: Arc<IdentityService>,
    pub store: Arc<dyn UserStore>,
    pub sessions: SessionLayerState,
    pub predictor: Arc<PredictionService>,
    pub renderer: DashboardRenderer,
    pub pages: PageController,
    pub started_at: Arc<Instant>,
}

impl FromRef<AppServices> for auth::AuthHandlerState {
    fn from_ref(s: &AppServices) -> Self {
        auth::AuthHandlerState {
            identity: Arc::clone(&s.identity),
            sessions: s.sessions.clone(),
        }
    }
}

impl FromRef<AppServices> for predict::PredictState {
    fn from_ref(s: &AppServices) -> Self {
        predict::PredictState {
            predictor: Arc::clone(&s.predictor),
            dataset_sha256: s.renderer.dataset().sha256().to_string(),
        }
    }
}

impl FromRef<AppServices> for dashboard::DashboardState {
    fn from_ref(s: &AppServices) -> Self {
        dashboard::DashboardState {
            renderer: s.renderer.clone(),
        }
    }
}

impl FromRef<AppServices> for pages::PagesState {
    fn from_ref(s: &AppServices) -> Self {
        pages::PagesState {
            controller: s.pages.clone(),
        }
    }
}

impl FromRef<AppServices> for health::HealthState {
    fn from_ref(s: &AppServices) -> Self {
        health::HealthState {
            store: Arc::clone(&s.store),
            session_registry: s.sessions.registry.clone(),
            dataset_rows: s.renderer.dataset().len(),
            started_at: Arc::clone(&s.started_at),
        }
    }
}

/// Session cookie security scheme for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("session_id"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::signup,
        auth::login,
        auth::logout,
        auth::current_session,
        predict::predict,
        predict::model_info,
        dashboard::list_tabs,
        dashboard::get_tab,
        pages::navigate,
    ),
    components(
        schemas(
            ApiResponse<String>,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::UserInfo,
            crate::domain::SessionState,
            predict::PredictRequest,
            predict::PredictResponse,
            predict::ModelInfo,
            crate::application::TabView,
            crate::application::Resolution,
            health::HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and user store reachability"),
        (name = "Authentication", description = "Signup, login and logout; the session travels in a cookie"),
        (name = "Prediction", description = "Insurance cost estimate and model metadata"),
        (name = "Dashboard", description = "Descriptive statistics and chart data per tab"),
        (name = "Pages", description = "Session-aware navigation"),
    ),
    info(
        title = "Medical Insurance Dashboard API",
        version = "0.1.0",
        description = "Insurance charge prediction and dataset exploration behind a login",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Build the full router. `/metrics` is only mounted when a Prometheus
/// handle is supplied.
pub fn create_api_router(services: AppServices, prometheus: Option<PrometheusHandle>) -> Router {
    // Login required
    let protected_routes = Router::new()
        .route("/predict", post(predict::predict))
        .route("/model", get(predict::model_info))
        .route("/dashboard", get(dashboard::list_tabs))
        .route("/dashboard/{tab}", get(dashboard::get_tab))
        .route_layer(middleware::from_fn(require_auth));

    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/session", get(auth::current_session))
        .route("/pages/{*page}", get(pages::navigate));

    let api_routes = public_routes
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(
            services.sessions.clone(),
            session_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_routes)
        .with_state(services);

    if let Some(handle) = prometheus {
        metrics::describe_metrics();
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics::prometheus_metrics))
                .with_state(metrics::MetricsState { handle }),
        );
    }

    router
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, Response, StatusCode};
    use chrono::Utc;
    use serde_json::{json, Value};

    use crate::application::dashboard::Dataset;
    use crate::application::prediction::{ModelArtifact, ModelMetrics};
    use crate::application::SessionRegistry;
    use crate::config::{DashboardConfig, SecurityConfig};
    use crate::domain::insurance::FEATURE_NAMES;
    use crate::domain::{InsuranceRecord, Region, RegionEncoding, Sex, Smoker};
    use crate::infrastructure::{DatabaseConfig, SeaOrmUserStore};

    pub(crate) async fn services() -> AppServices {
        let store: Arc<dyn UserStore> = Arc::new(
            SeaOrmUserStore::open(&DatabaseConfig::in_memory())
                .await
                .unwrap(),
        );
        let records = vec![
            InsuranceRecord {
                age: 19,
                sex: Sex::Female,
                bmi: 27.9,
                children: 0,
                smoker: Smoker::Yes,
                region: Region::Southwest,
                charges: 16884.92,
            },
            InsuranceRecord {
                age: 18,
                sex: Sex::Male,
                bmi: 33.77,
                children: 1,
                smoker: Smoker::No,
                region: Region::Southeast,
                charges: 1725.55,
            },
            InsuranceRecord {
                age: 28,
                sex: Sex::Male,
                bmi: 33.0,
                children: 3,
                smoker: Smoker::No,
                region: Region::Northwest,
                charges: 4449.46,
            },
        ];
        let artifact = ModelArtifact {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            intercept: -12000.0,
            coefficients: vec![257.0, -18.0, 335.0, 425.0, 23650.0, -271.0],
            region_encoding: RegionEncoding::Alphabetical,
            metrics: ModelMetrics {
                r2_test: 0.78,
                r2_train: 0.75,
                train_rows: 1070,
                test_rows: 268,
            },
            dataset_sha256: String::new(),
            trained_at: Utc::now(),
        };

        let renderer = DashboardRenderer::new(
            Arc::new(Dataset::from_records(records)),
            DashboardConfig::default(),
            RegionEncoding::Alphabetical,
        );
        AppServices {
            identity: Arc::new(IdentityService::new(Arc::clone(&store), 4)),
            store,
            sessions: SessionLayerState::new(SessionRegistry::shared(60), &SecurityConfig::default()),
            predictor: Arc::new(PredictionService::from_artifact(artifact).unwrap()),
            pages: PageController::new(renderer.clone()),
            renderer,
            started_at: Arc::new(Instant::now()),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
        use tower::Service;
        let mut svc = app.clone().into_service();
        svc.call(req).await.unwrap()
    }

    fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_req(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(resp: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// `name=value` part of the Set-Cookie header
    fn session_cookie(resp: &Response<Body>) -> String {
        resp.headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .unwrap()
            .to_string()
    }

    async fn signed_in(app: &Router) -> String {
        let signup = json!({"username": "A", "email": "a@x.com", "password": "p1"});
        let resp = send(app, post_json("/api/v1/auth/signup", signup, None)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let login = json!({"email": "a@x.com", "password": "p1"});
        let resp = send(app, post_json("/api/v1/auth/login", login, None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        session_cookie(&resp)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = create_api_router(services().await, None);
        let resp = send(&app, get_req("/health", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key(request_id::REQUEST_ID_HEADER));

        let body = json_body(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["dataset_rows"], 3);
        assert_eq!(body["registered_users"], 0);
    }

    #[tokio::test]
    async fn signup_login_and_session() {
        let app = create_api_router(services().await, None);
        let cookie = signed_in(&app).await;
        assert!(cookie.starts_with("session_id="));

        let resp = send(&app, get_req("/api/v1/auth/session", Some(&cookie))).await;
        let body = json_body(resp).await;
        assert_eq!(
            body["data"],
            json!({"state": "authenticated", "username": "A", "email": "a@x.com"})
        );
    }

    #[tokio::test]
    async fn duplicate_signup_is_conflict() {
        let app = create_api_router(services().await, None);
        signed_in(&app).await;

        let again = json!({"username": "B", "email": "a@x.com", "password": "p2"});
        let resp = send(&app, post_json("/api/v1/auth/signup", again, None)).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body = json_body(resp).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = create_api_router(services().await, None);
        signed_in(&app).await;

        let login = json!({"email": "a@x.com", "password": "nope"});
        let resp = send(&app, post_json("/api/v1/auth/login", login, None)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn overlong_signup_password_is_rejected() {
        let app = create_api_router(services().await, None);
        let password = format!("{}A", "x".repeat(72));
        let signup = json!({"username": "A", "email": "a@x.com", "password": password});
        let resp = send(&app, post_json("/api/v1/auth/signup", signup, None)).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = send(&app, get_req("/health", None)).await;
        assert_eq!(json_body(resp).await["registered_users"], 0);
    }

    #[tokio::test]
    async fn protected_routes_need_login() {
        let app = create_api_router(services().await, None);
        let resp = send(&app, get_req("/api/v1/dashboard/statistics", None)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let form = json!({"age": 25, "sex": "male", "bmi": 25.0, "children": 0, "smoker": "no", "region": "northeast"});
        let resp = send(&app, post_json("/api/v1/predict", form, Some("session_id=forged"))).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn predict_is_deterministic() {
        let app = create_api_router(services().await, None);
        let cookie = signed_in(&app).await;
        let form = json!({"age": 25, "sex": "male", "bmi": 25.0, "children": 0, "smoker": "no", "region": "northeast"});

        let first = json_body(send(&app, post_json("/api/v1/predict", form.clone(), Some(&cookie))).await).await;
        let second = json_body(send(&app, post_json("/api/v1/predict", form, Some(&cookie))).await).await;
        assert_eq!(first["data"], second["data"]);
        // -12000 + 257*25 - 18 + 335*25
        assert_eq!(first["data"]["display"], "$2,782.00");
    }

    #[tokio::test]
    async fn predict_rejects_out_of_range_and_unknown_labels() {
        let app = create_api_router(services().await, None);
        let cookie = signed_in(&app).await;

        let too_old = json!({"age": 120, "sex": "male", "bmi": 25.0, "children": 0, "smoker": "no", "region": "northeast"});
        let resp = send(&app, post_json("/api/v1/predict", too_old, Some(&cookie))).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bad_region = json!({"age": 30, "sex": "male", "bmi": 25.0, "children": 0, "smoker": "no", "region": "north"});
        let resp = send(&app, post_json("/api/v1/predict", bad_region, Some(&cookie))).await;
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn dashboard_tabs() {
        let app = create_api_router(services().await, None);
        let cookie = signed_in(&app).await;

        let resp = send(&app, get_req("/api/v1/dashboard/insights", Some(&cookie))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["kind"], "insights");

        let resp = send(&app, get_req("/api/v1/dashboard/nope", Some(&cookie))).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn pages_redirect_by_session() {
        let app = create_api_router(services().await, None);

        let resp = send(&app, get_req("/api/v1/pages/dashboard/age", None)).await;
        let body = json_body(resp).await;
        assert_eq!(body["data"]["redirected"], true);
        assert_eq!(body["data"]["view"]["page"], "login");

        let cookie = signed_in(&app).await;
        let resp = send(&app, get_req("/api/v1/pages/dashboard/age", Some(&cookie))).await;
        let body = json_body(resp).await;
        assert_eq!(body["data"]["redirected"], false);
        assert_eq!(body["data"]["view"]["tab"], "age");

        let resp = send(&app, get_req("/api/v1/pages/login", Some(&cookie))).await;
        let body = json_body(resp).await;
        assert_eq!(body["data"]["view"]["tab"], "statistics");
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let app = create_api_router(services().await, None);
        let cookie = signed_in(&app).await;

        let resp = send(&app, post_json("/api/v1/auth/logout", json!({}), Some(&cookie))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(session_cookie(&resp).ends_with('='));

        let resp = send(&app, get_req("/api/v1/model", Some(&cookie))).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn model_metadata() {
        let app = create_api_router(services().await, None);
        let cookie = signed_in(&app).await;

        let body = json_body(send(&app, get_req("/api/v1/model", Some(&cookie))).await).await;
        assert_eq!(body["data"]["region_encoding"], "alphabetical");
        assert_eq!(body["data"]["region_codes"][0]["region"], "northeast");
        assert_eq!(body["data"]["trained_on_served_dataset"], false);
    }

    #[tokio::test]
    async fn openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/predict"));
        assert!(doc.paths.paths.contains_key("/api/v1/auth/login"));
    }
}
