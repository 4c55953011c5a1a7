pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::auth::require_auth;
use crate::jobs::handlers;
use crate::state::AppState;
use crate::upload::{handlers::handle_upload, MAX_FILE_BYTES};

/// Multipart framing on top of the file itself.
const UPLOAD_BODY_SLACK: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let auth = from_fn_with_state(state.clone(), require_auth);

    Router::new()
        .route("/api", get(health::root_handler))
        .route("/api/health", get(health::health_handler))
        // Jobs API
        .route(
            "/api/jobs",
            get(handlers::handle_list_jobs)
                .merge(post(handlers::handle_create_job).route_layer(auth.clone())),
        )
        .route(
            "/api/jobs/apply",
            post(handlers::handle_apply).route_layer(auth.clone()),
        )
        .route(
            "/api/jobs/cv/download",
            get(handlers::handle_cv_download).route_layer(auth.clone()),
        )
        .route("/api/jobs/:id", get(handlers::handle_get_job))
        // Upload API
        .route(
            "/api/upload/:field",
            post(handle_upload)
                .route_layer(auth)
                .layer(DefaultBodyLimit::max(MAX_FILE_BYTES + UPLOAD_BODY_SLACK)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth::StaticAuthenticator;
    use crate::models::company::Company;
    use crate::models::profession::Profession;
    use crate::store::MemoryStore;
    use crate::upload::{UploadMode, UploadStorage};

    const TOKEN: &str = "owner-token";

    struct TestApp {
        router: Router,
        profession: Uuid,
    }

    async fn app() -> TestApp {
        app_with_uploads(UploadMode::Memory).await
    }

    async fn app_with_uploads(uploads: UploadMode) -> TestApp {
        let owner = Uuid::new_v4();
        let store = MemoryStore::new();
        let profession = Uuid::new_v4();
        store
            .insert_profession(Profession {
                id: profession,
                name: "Electrician".into(),
                category: Some("Trades".into()),
            })
            .await;
        store
            .insert_company(Company {
                id: Uuid::new_v4(),
                user_id: owner,
                company_name: "Volt & Co".into(),
                logo: None,
                description: None,
                total_jobs_posted: 0,
            })
            .await;

        let state = AppState {
            store: Arc::new(store),
            auth: Arc::new(StaticAuthenticator::new([(TOKEN.to_string(), owner)])),
            uploads: Arc::new(UploadStorage::new(uploads)),
        };
        TestApp {
            router: build_router(state),
            profession,
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    const BOUNDARY: &str = "X-BOUNDARY";

    /// Multipart upload with one PNG part per `(part name, file name)`.
    fn upload_request(uri: &str, parts: &[(&str, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, file_name) in parts {
            body.push_str(&format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: image/png\r\n\r\n\
                 PNGDATA\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let (status, body) = send(&app.router, get_request("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn test_missing_job_is_404_envelope() {
        let app = app().await;
        let (status, body) = send(&app.router, get_request(&format!("/api/jobs/{}", Uuid::new_v4()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "message": "Job not found" }));
    }

    #[tokio::test]
    async fn test_malformed_job_id_is_400() {
        let app = app().await;
        let (status, body) = send(&app.router, get_request("/api/jobs/not-a-uuid")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_protected_routes_need_token() {
        let app = app().await;
        let payload = json!({ "profession": app.profession });

        let (status, body) = send(&app.router, post_json("/api/jobs", payload.clone(), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) = send(
            &app.router,
            post_json("/api/jobs", payload, Some("someone-else")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app.router, get_request("/api/jobs/cv/download?traineeId=x")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_list_detail_apply_flow() {
        let app = app().await;

        let (status, body) = send(
            &app.router,
            post_json(
                "/api/jobs",
                json!({ "profession": app.profession, "title": "Site electrician", "jobType": "full-time" }),
                Some(TOKEN),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["professionName"], "Electrician");
        let job_id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&app.router, get_request("/api/jobs?jobType=full-time")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["company"]["companyName"], "Volt & Co");

        let (_, body) = send(&app.router, get_request("/api/jobs?jobType=part-time")).await;
        assert_eq!(body["count"], 0);

        let (_, body) = send(&app.router, get_request(&format!("/api/jobs/{job_id}"))).await;
        assert_eq!(body["data"]["views"], 1);

        let professional = Uuid::new_v4();
        let apply = json!({ "jobId": job_id, "professionalId": professional });
        let (status, body) = send(
            &app.router,
            post_json("/api/jobs/apply", apply.clone(), Some(TOKEN)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Application submitted successfully");
        assert_eq!(body["data"]["applicationsCount"], 1);
        assert_eq!(body["data"]["applications"][0]["professional"], professional.to_string());

        let (status, body) = send(&app.router, post_json("/api/jobs/apply", apply, Some(TOKEN))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Already applied to this job");
    }

    #[tokio::test]
    async fn test_create_without_profession_is_400() {
        let app = app().await;
        let (status, body) = send(
            &app.router,
            post_json("/api/jobs", json!({ "title": "No profession" }), Some(TOKEN)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_cv_download_unknown_professional() {
        let app = app().await;
        let request = Request::builder()
            .uri(format!("/api/jobs/cv/download?professionalId={}", Uuid::new_v4()))
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "CV not found");
    }

    #[tokio::test]
    async fn test_upload_into_memory() {
        let app = app().await;
        let request = upload_request("/api/upload/logo", &[("logo", "logo.png")]);
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["storage"], "memory");
        assert_eq!(body["data"]["size"], 7);
        assert_eq!(body["data"]["mimeType"], "image/png");
    }

    #[tokio::test]
    async fn test_upload_field_cannot_leave_upload_root() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app_with_uploads(UploadMode::Disk {
            root: tmp.path().join("uploads"),
        })
        .await;

        let request = upload_request(
            "/api/upload/..%2F..%2Fescaped",
            &[("../../escaped", "x.png")],
        );
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);

        let (status, body) = send(
            &app.router,
            upload_request("/api/upload/logo", &[("logo", "logo.png")]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let path = body["data"]["path"].as_str().unwrap();
        assert!(std::path::Path::new(path).starts_with(tmp.path().join("uploads/company-logos")));
    }

    #[tokio::test]
    async fn test_upload_rejects_extra_files() {
        let app = app().await;

        let request = upload_request("/api/upload/logo", &[("logo", "a.png"), ("logo", "b.png")]);
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Only one file may be uploaded in field 'logo'");

        let request = upload_request("/api/upload/logo", &[("logo", "a.png"), ("photo", "b.png")]);
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Unexpected file field 'photo'");
    }
}
