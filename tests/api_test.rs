mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use bigdecimal::BigDecimal;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::*;
use ecr_core::adapters::SimulatedGateway;
use ecr_core::config::Config;
use ecr_core::{create_app, AppState};

fn app() -> Router {
    create_app(AppState::in_memory(
        registry(),
        Arc::new(SimulatedGateway),
        &Config::in_memory(),
    ))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-employer-id", EMPLOYER)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-employer-id", EMPLOYER)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn upload(query: &str, lines: &[&str]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/returns/upload?{}", query))
        .header("x-employer-id", EMPLOYER)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(return_file(lines)))
        .unwrap()
}

fn amount(value: &Value) -> BigDecimal {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "connected");
}

#[tokio::test]
async fn test_employer_header_is_required() {
    let app = app();
    let request = Request::builder().uri("/returns").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    let request = Request::builder()
        .uri("/returns")
        .header("x-employer-id", "not an id!")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_rejects_non_text_file() {
    let app = app();
    let (status, _) = send(
        &app,
        upload("wage_month=2024-03&file_name=march.csv", &[ALICE]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, get("/returns")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["in_process"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_upload_validation_errors() {
    let app = app();

    let (status, _) = send(&app, upload("wage_month=2024-13", &[ALICE])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        upload("wage_month=2024-03&return_type=Revised%20Return", &[ALICE]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        upload("wage_month=2024-03", &["100000000001#~#Alice#~#50000"]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("line 1"));
}

#[tokio::test]
async fn test_duplicate_upload_conflicts() {
    let app = app();
    let (status, first) = send(&app, upload("wage_month=2024-03", &[ALICE])).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, upload("wage_month=March%202024", &[BOB])).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["existing_return_id"], first["return_file_id"]);
}

#[tokio::test]
async fn test_full_return_to_payment_flow() {
    let app = app();

    let (status, uploaded) = send(
        &app,
        upload(
            "wage_month=2024-03&contribution_rate=12&file_name=march.txt",
            &[ALICE, BOB],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(uploaded["status"], "uploaded");
    assert_eq!(uploaded["trrn"].as_str().map(str::len), Some(12));
    assert_eq!(uploaded["totals"]["members"]["active"], 2);
    let filing_id = uploaded["return_file_id"].as_str().unwrap().to_string();

    let (status, listed) = send(&app, get("/returns")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["in_process"][0]["id"], filing_id.as_str());
    assert_eq!(listed["in_process"][0]["serial_no"], 1);

    let (status, approved) = send(
        &app,
        post_json(&format!("/returns/{}/approve", filing_id), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&approved["challan"]["total_amount"]), BigDecimal::from(20100));
    let challan_id = approved["challan_id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        post_json(&format!("/returns/{}/approve", filing_id), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, detail) = send(&app, get(&format!("/returns/{}", filing_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["status"], "approved");
    assert_eq!(detail["challan_status"], "due");

    let (status, validated) = send(
        &app,
        post_json(
            "/bank-validations",
            json!({
                "bank_name": BANK,
                "username": BANK_USER,
                "password": BANK_PASSWORD,
                "challan_id": challan_id,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(validated["valid"], true);
    assert!(validated["bank_details"].get("password").is_none());

    let (status, _) = send(
        &app,
        post_json(
            &format!("/challans/{}/pay", challan_id),
            json!({ "bank_name": BANK, "username": BANK_USER, "password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let pay = post_json(
        &format!("/challans/{}/pay", challan_id),
        json!({ "bank_name": BANK, "username": BANK_USER, "password": BANK_PASSWORD }),
    );
    let response = app.clone().oneshot(pay).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let paid: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(paid["message"], "Transaction Successful");
    assert_eq!(paid["payment"]["status"], "success");
    assert_eq!(paid["payment"]["crn"].as_str().map(str::len), Some(14));

    let (status, challans) = send(&app, get("/challans")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(challans["challans"][0]["status"], "paid");
    assert_eq!(challans["challans"][0]["payment"]["crn"], paid["payment"]["crn"]);

    let (status, _) = send(
        &app,
        post_json(&format!("/challans/{}/cancel", challan_id), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, dashboard) = send(&app, get("/dashboard")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["summary"]["uploaded_returns"], 1);
    assert_eq!(dashboard["summary"]["approved_returns"], 1);
    assert_eq!(dashboard["summary"]["pending_challans"], 0);
}

#[tokio::test]
async fn test_reject_frees_wage_month() {
    let app = app();
    let (_, uploaded) = send(&app, upload("wage_month=2024-03", &[ALICE])).await;
    let filing_id = uploaded["return_file_id"].as_str().unwrap().to_string();

    let (status, rejected) = send(
        &app,
        post_json(
            &format!("/returns/{}/reject", filing_id),
            json!({ "reason": "wrong wages" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["reason"], "wrong wages");

    let (status, _) = send(&app, get(&format!("/returns/{}", filing_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, upload("wage_month=2024-03", &[ALICE, BOB])).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_download_returns_original_file() {
    let app = app();
    let (_, uploaded) = send(
        &app,
        upload("wage_month=2024-03&file_name=march.txt", &[ALICE, BOB]),
    )
    .await;
    let filing_id = uploaded["return_file_id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(get(&format!("/returns/{}/file", filing_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"march.txt\""
    );
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.as_ref(), return_file(&[ALICE, BOB]).as_slice());
}

#[tokio::test]
async fn test_other_employer_sees_nothing() {
    let app = app();
    let (_, uploaded) = send(&app, upload("wage_month=2024-03", &[ALICE])).await;
    let filing_id = uploaded["return_file_id"].as_str().unwrap();

    let request = Request::builder()
        .uri(format!("/returns/{}", filing_id))
        .header("x-employer-id", OTHER_EMPLOYER)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wage_months_latest_first() {
    let app = app();
    send(&app, upload("wage_month=2024-01", &[ALICE])).await;
    send(&app, upload("wage_month=2024-03", &[ALICE])).await;
    send(&app, upload("wage_month=2024-02", &[ALICE])).await;

    let (status, body) = send(&app, get("/wage-months")).await;
    assert_eq!(status, StatusCode::OK);
    let months: Vec<&str> = body["months"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["wage_month"].as_str().unwrap())
        .collect();
    assert_eq!(months, vec!["2024-03", "2024-02", "2024-01"]);
}

#[tokio::test]
async fn test_banks_hide_credentials() {
    let app = app();
    let (status, body) = send(&app, get("/annexures/banks")).await;
    assert_eq!(status, StatusCode::OK);

    let banks = body["banks"].as_array().unwrap();
    assert_eq!(banks.len(), 2);
    assert_eq!(banks[0]["name"], BANK);
    assert!(banks.iter().all(|bank| bank.get("password").is_none()));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = app();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "req-42");
}
