//! End-to-end journey through the public portal router: register, view the dashboard,
//! sign out, sign back in and see the review decision.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use wav_portal::backend::{AccountId, InMemoryBackend, Operation};
use wav_portal::workflows::registration::ApplicationStatus;
use wav_portal::{portal_router, PortalState};

struct Client {
    router: Router,
}

impl Client {
    fn new(backend: Arc<InMemoryBackend>) -> Self {
        Self {
            router: portal_router(PortalState::new(backend)),
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("route responds");
        let status = response.status();
        (status, read_json(response).await)
    }
}

async fn read_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json body")
}

async fn register(client: &Client) -> String {
    let (status, body) = client
        .send(Method::POST, "/api/v1/registrations", None, None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["registration_id"].as_str().expect("id").to_string();
    let base = format!("/api/v1/registrations/{id}");

    let (status, _) = client
        .send(
            Method::PATCH,
            &format!("{base}/identity"),
            None,
            Some(json!({
                "firstName": "Kadiatu",
                "lastName": "Jalloh",
                "email": "kadiatu@example.com",
                "phone": "+23279001122",
                "password": "aberdeen1",
                "confirmPassword": "aberdeen1",
                "gender": "prefer-not-to-say",
                "dateOfBirth": "2001-11-05"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = client
        .send(Method::POST, &format!("{base}/identity/submit"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK, "identity step: {body}");
    assert_eq!(body["step"], json!(2));
    let token = body["session_token"]
        .as_str()
        .expect("session token")
        .to_string();

    let (status, _) = client
        .send(
            Method::PATCH,
            &format!("{base}/application"),
            None,
            Some(json!({
                "address": "Aberdeen, Freetown",
                "schoolUniversity": "Limkokwing University",
                "currentCourse": "Software Engineering",
                "educationLevel": "high-school",
                "programmingExperience": "intermediate",
                "webDevChallenges": "Connecting the front end to a database",
                "bootcampGoals": "Work on a product team",
                "previousProjects": "A class timetable app",
                "hasLaptop": true,
                "availabilityConfirmed": true,
                "agreeTerms": true
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = client
        .send(Method::POST, &format!("{base}/application/submit"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK, "application step: {body}");
    assert_eq!(body, json!({ "redirect": "dashboard" }));

    let (status, _) = client.send(Method::GET, &base, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "finished wizards are dropped");

    token
}

#[tokio::test]
async fn registered_student_sees_pending_dashboard() {
    let backend = Arc::new(InMemoryBackend::default());
    let client = Client::new(Arc::clone(&backend));
    let token = register(&client).await;

    let (status, body) = client
        .send(Method::GET, "/api/v1/dashboard", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    let dashboard = &body["dashboard"];
    assert_eq!(dashboard["welcome"], json!("Welcome, Kadiatu!"));
    assert_eq!(dashboard["status"], json!("pending"));
    assert_eq!(
        dashboard["payment"]["reference"],
        json!("Kadiatu Jalloh Bootcamp Fee")
    );
    assert_eq!(
        dashboard["application"]["previous_projects"],
        json!("A class timetable app")
    );
    assert_eq!(backend.calls(Operation::FetchProfile), 1);
    assert_eq!(backend.calls(Operation::FetchApplication), 1);
}

#[tokio::test]
async fn sign_out_then_sign_in_shows_approval() {
    let backend = Arc::new(InMemoryBackend::default());
    let client = Client::new(Arc::clone(&backend));
    let token = register(&client).await;

    let (status, body) = client
        .send(Method::DELETE, "/api/v1/session", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect"], json!("landing"));

    let (status, body) = client
        .send(Method::GET, "/api/v1/dashboard", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["redirect"], json!("login"));

    let (status, body) = client
        .send(
            Method::POST,
            "/api/v1/session",
            None,
            Some(json!({ "email": "kadiatu@example.com", "password": "aberdeen1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect"], json!("dashboard"));
    let token = body["session_token"].as_str().expect("token").to_string();
    let account_id: AccountId =
        serde_json::from_value(body["account"]["id"].clone()).expect("account id");

    backend
        .set_application_status(&account_id, ApplicationStatus::Approved)
        .expect("status updated");

    let (status, body) = client
        .send(Method::GET, "/api/v1/dashboard", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dashboard"]["status"], json!("approved"));
    assert_eq!(
        body["dashboard"]["status_notice"],
        json!(
            "Congratulations! Your application has been approved. \
             Please complete your payment to secure your spot."
        )
    );
}

#[tokio::test]
async fn second_registration_with_same_email_is_refused() {
    let backend = Arc::new(InMemoryBackend::default());
    let client = Client::new(Arc::clone(&backend));
    register(&client).await;

    let (_, body) = client
        .send(Method::POST, "/api/v1/registrations", None, None)
        .await;
    let base = format!(
        "/api/v1/registrations/{}",
        body["registration_id"].as_str().expect("id")
    );
    client
        .send(
            Method::PATCH,
            &format!("{base}/identity"),
            None,
            Some(json!({
                "firstName": "Kadiatu",
                "lastName": "Jalloh",
                "email": "kadiatu@example.com",
                "phone": "+23279001122",
                "password": "aberdeen1",
                "confirmPassword": "aberdeen1",
                "gender": "female",
                "dateOfBirth": "2001-11-05"
            })),
        )
        .await;

    let (status, body) = client
        .send(Method::POST, &format!("{base}/identity/submit"), None, None)
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        body["errors"]["general"],
        json!("An account with this email already exists. Please try logging in instead.")
    );
    let (_, view) = client.send(Method::GET, &base, None, None).await;
    assert_eq!(view["step"], json!(1));
    assert_eq!(view["loading"], json!(false));
}

#[tokio::test]
async fn login_validation_is_local() {
    let backend = Arc::new(InMemoryBackend::default());
    let client = Client::new(Arc::clone(&backend));

    let (status, body) = client
        .send(
            Method::POST,
            "/api/v1/session",
            None,
            Some(json!({ "email": "", "password": "" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Please fill in all fields"));
    assert_eq!(backend.calls(Operation::SignIn), 0);
}
