//! Integration tests for issuance, scanning, manual validation and reporting.

mod common;

use axum::http::{header, Method, StatusCode};
use common::*;
use domain::models::{EntryPolicy, RasterImage, DEFAULT_MAX_IMAGE_DIMENSION};
use domain::services::{BarcodeDecoder, QrDecoder};
use fake::{faker::name::en::Name, Fake};
use serde_json::json;
use shared::encoding::png_data_url;

#[tokio::test]
async fn test_issue_then_scan_grants_entry() {
    let app = create_test_app();

    let issued = issue(&app, "Alex").await;
    let code = issued["code"].as_str().unwrap().to_string();
    assert!(code.starts_with("ARD_"));
    assert_eq!(issued["invitee_name"], "Alex");
    assert_eq!(issued["artifact_id"], format!("{}.png", code));
    assert!(issued["image_data"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));

    let result = scan(&app, issued["image_data"].as_str().unwrap(), "camera").await;
    assert_eq!(result["granted"], true);
    assert_eq!(result["status"], "granted");
    assert_eq!(result["code"], code);
    assert_eq!(result["invitee_name"], "Alex");
    assert_eq!(result["message"], "Welcome Alex!");

    let stats = stats(&app).await;
    assert_eq!(stats["generated_count"], 1);
    assert_eq!(stats["checked_in_count"], 1);
    assert_eq!(stats["remaining_count"], 0);
    assert_eq!(stats["denied_count"], 0);
}

#[tokio::test]
async fn test_unknown_code_is_denied() {
    let app = create_test_app();
    issue(&app, "Alex").await;

    let response = send(&app, get_request("/api/v1/validate/ARD_NOTREAL")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["granted"], false);
    assert_eq!(body["status"], "invalid");
    assert_eq!(body["message"], "Invalid code");
    assert!(body.get("invitee_name").is_none());

    let stats = stats(&app).await;
    assert_eq!(stats["checked_in_count"], 0);
    assert_eq!(stats["denied_count"], 1);
}

#[tokio::test]
async fn test_second_scan_is_already_used() {
    let app = create_test_app();
    let issued = issue(&app, "Sam").await;
    let image = issued["image_data"].as_str().unwrap();

    let first = scan(&app, image, "camera").await;
    assert_eq!(first["status"], "granted");

    let second = scan(&app, image, "upload").await;
    assert_eq!(second["granted"], false);
    assert_eq!(second["status"], "used");
    assert_eq!(second["invitee_name"], "Sam");
    assert_eq!(second["message"], "Already used for Sam");

    let stats = stats(&app).await;
    assert_eq!(stats["checked_in_count"], 1);
    assert_eq!(stats["denied_count"], 1);
    assert_eq!(stats["total_scans"], 2);
}

#[tokio::test]
async fn test_unlimited_policy_grants_repeat_scans() {
    let app = create_test_app_with_policy(EntryPolicy::Unlimited);
    let issued = issue(&app, "Sam").await;
    let code = issued["code"].as_str().unwrap();

    for _ in 0..2 {
        let response = send(&app, get_request(&format!("/api/v1/validate/{}", code))).await;
        let body = body_json(response).await;
        assert_eq!(body["status"], "granted");
    }

    let stats = stats(&app).await;
    assert_eq!(stats["checked_in_count"], 1);
    assert_eq!(stats["total_scans"], 2);
}

#[tokio::test]
async fn test_manual_entry_trims_and_matches_exactly() {
    let app = create_test_app();
    let issued = issue(&app, "Alex").await;
    let code = issued["code"].as_str().unwrap();

    let lower = code.to_lowercase();
    let response = send(&app, get_request(&format!("/api/v1/validate/{}", lower))).await;
    assert_eq!(body_json(response).await["status"], "invalid");

    let padded = format!("/validate/%20{}%20", code);
    let response = send(&app, get_request(&padded)).await;
    let body = body_json(response).await;
    assert_eq!(body["status"], "granted");
    assert_eq!(body["code"], code);
}

#[tokio::test]
async fn test_blank_code_is_rejected_without_ledger_entry() {
    let app = create_test_app();

    let response = send(&app, get_request("/api/v1/validate/%20%20")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");

    let response = send(&app, get_request("/api/v1/checkins")).await;
    let body = body_json(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_image_without_barcode() {
    let app = create_test_app();
    let blank = RasterImage::filled(120, 120, 255).to_png().unwrap();

    let result = scan(&app, &png_data_url(&blank), "upload").await;
    assert_eq!(result["granted"], false);
    assert_eq!(result["status"], "no_code_found");
    assert_eq!(result["message"], "No barcode found");

    let response = send(&app, get_request("/api/v1/checkins")).await;
    assert!(body_json(response).await["data"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_scan_rejects_bad_payloads() {
    let app = create_test_app();

    for image_data in ["", "   ", "data:image/png;base64,!!!not-base64!!!"] {
        let response = send(
            &app,
            json_request(
                Method::POST,
                "/api/v1/scan",
                json!({ "image_data": image_data }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{:?}", image_data);
    }

    // Valid base64, but not an image
    let response = send(
        &app,
        json_request(
            Method::POST,
            "/scan",
            json!({ "image_data": "aGVsbG8gd29ybGQ=" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_scan_rejects_oversized_image() {
    let app = create_test_app();
    let wide = RasterImage::filled(DEFAULT_MAX_IMAGE_DIMENSION + 1, 1, 255)
        .to_png()
        .unwrap();

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/scan",
            json!({ "image_data": png_data_url(&wide) }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("exceeds"));

    let response = send(&app, get_request("/api/v1/checkins")).await;
    assert!(body_json(response).await["data"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_issue_validation() {
    let app = create_test_app();

    let response = send(
        &app,
        json_request(Method::POST, "/api/v1/invites", json!({ "invitee_name": "  " })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "invitee_name");

    let long_name = "x".repeat(150);
    let response = send(
        &app,
        json_request(Method::POST, "/api/v1/invites", json!({ "invitee_name": long_name })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(stats(&app).await["generated_count"], 0);
}

#[tokio::test]
async fn test_legacy_generate_accepts_staff_name() {
    let app = create_test_app();
    let response = send(
        &app,
        json_request(Method::POST, "/generate", json!({ "staff_name": "Jordan" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["invitee_name"], "Jordan");

    let response = send(&app, get_request("/stats")).await;
    assert_eq!(body_json(response).await["generated_count"], 1);
}

#[tokio::test]
async fn test_issued_codes_are_distinct() {
    let app = create_test_app();
    let mut codes = std::collections::HashSet::new();
    for _ in 0..20 {
        let name: String = Name().fake();
        let issued = issue(&app, &name).await;
        assert!(codes.insert(issued["code"].as_str().unwrap().to_string()));
    }
    assert_eq!(stats(&app).await["generated_count"], 20);
}

#[tokio::test]
async fn test_invite_lookup() {
    let app = create_test_app();
    let issued = issue(&app, "Alex").await;
    let code = issued["code"].as_str().unwrap();

    let response = send(&app, get_request(&format!("/api/v1/invites/{}", code))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["invitee_name"], "Alex");
    assert_eq!(body["issued_at"], issued["issued_at"]);

    let response = send(&app, get_request("/api/v1/invites/ARD_NOTREAL")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn test_download_artifact() {
    let app = create_test_app();
    let issued = issue(&app, "Alex").await;
    let code = issued["code"].as_str().unwrap();
    let artifact_id = issued["artifact_id"].as_str().unwrap();
    assert!(app.artifacts_dir.path().join(artifact_id).exists());

    let response = send(&app, get_request(&format!("/download/{}", artifact_id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let png = body_bytes(response).await;
    let image = RasterImage::from_encoded(&png, DEFAULT_MAX_IMAGE_DIMENSION).unwrap();
    assert_eq!(QrDecoder.decode(&image), vec![code.to_string()]);
}

#[tokio::test]
async fn test_download_regenerates_missing_artifact() {
    let app = create_test_app();
    let issued = issue(&app, "Alex").await;
    let artifact_id = issued["artifact_id"].as_str().unwrap();
    let path = app.artifacts_dir.path().join(artifact_id);
    std::fs::remove_file(&path).unwrap();

    let response = send(&app, get_request(&format!("/api/v1/download/{}", artifact_id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(path.exists());
}

#[tokio::test]
async fn test_download_rejects_unknown_and_unsafe_ids() {
    let app = create_test_app();

    for uri in [
        "/api/v1/download/ARD_NOTREAL.png",
        "/api/v1/download/..%2F..%2Fetc%2Fpasswd",
        "/api/v1/download/notes.txt",
    ] {
        let response = send(&app, get_request(uri)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn test_checkins_listing_newest_first() {
    let app = create_test_app();
    let issued = issue(&app, "Alex").await;
    let code = issued["code"].as_str().unwrap();

    send(&app, get_request("/api/v1/validate/ARD_NOTREAL")).await;
    send(&app, get_request(&format!("/api/v1/validate/{}", code))).await;

    let response = send(&app, get_request("/api/v1/checkins")).await;
    let body = body_json(response).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["code"], code);
    assert_eq!(data[0]["outcome"], "granted");
    assert_eq!(data[0]["source"], "manual");
    assert_eq!(data[1]["outcome"], "denied_unknown_code");

    let response = send(&app, get_request("/api/v1/checkins?limit=1")).await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);

    let response = send(&app, get_request("/api/v1/checkins?limit=0")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_probes_and_headers() {
    let app = create_test_app();

    let response = send(&app, get_request("/api/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"]["backend"], "memory");
    assert_eq!(body["entry_policy"], "single_entry");

    let response = send(&app, get_request("/api/health/live")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, get_request("/api/health/ready")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_app();
    let request = axum::http::Request::builder()
        .uri("/api/health/live")
        .header("X-Request-ID", "desk-3-scan-17")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.headers()["x-request-id"], "desk-3-scan-17");
}
