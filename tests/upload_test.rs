//! Integration tests for the upload route.

mod helpers;

use http::StatusCode;

use helpers::{MultipartBuilder, TestApp, gzip};

const XRD_SAMPLE: &str = "\
2theta\tcounts
10.00\t120
10.05\t240
10.10\t60
";

const MACCOR_WMG_SAMPLE: &str = "\
Maccor S4000 export\tcell 42
Cycle\tStep\tTest Time (s)\tStep Time (s)\tCurrent (A)\tVoltage (V)\tCapacity (Ah)\tEnergy (Wh)\tState\tDPT Time\tTemp 1 (C)
1\t1\t0.0\t0.0\t0.5\t3.60\t0.0\t0.0\tC\t30/10/2019 15:47:26\t24.9
1\t1\t10.0\t10.0\t0.5\t3.72\t0.00139\t0.005\tC\t30/10/2019 15:47:36\t25.1
1\t2\t20.0\t0.0\t0.5\t3.55\t0.00139\t0.005\tD\t30/10/2019 15:47:46\t25.3
";

/// Form fields for an XRD upload.
fn xrd_form() -> MultipartBuilder {
    MultipartBuilder::new()
        .text("test_type", "XRD")
        .text("instrument", "STADI P")
        .text("instrument_brand", "STOE")
}

#[tokio::test]
async fn test_upload_form_get() {
    let app = TestApp::new().await;

    let response = app.get("/api/upload_file").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text.contains("Upload"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::new().await;

    let response = app.get("/definitely/not/here").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["message"], "This page does not exist");
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let response = app.get("/api/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["data"]["status"], "ok");
}

#[tokio::test]
async fn test_upload_missing_brand() {
    let app = TestApp::new().await;
    let body = MultipartBuilder::new()
        .text("test_type", "XRD")
        .text("instrument", "STADI P")
        .finish();

    let response = app.post_multipart("/api/upload_file", body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json()["message"],
        "Please provide an instrument brand"
    );
}

#[tokio::test]
async fn test_upload_no_file_attached() {
    let app = TestApp::new().await;
    let body = xrd_form().finish();

    let response = app.post_multipart("/api/upload_file", body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["message"], "No file attached");
}

#[tokio::test]
async fn test_upload_rejects_uncompressed_file() {
    let app = TestApp::new().await;
    let body = xrd_form()
        .file("files", "scan.txt", XRD_SAMPLE.as_bytes())
        .finish();

    let response = app.post_multipart("/api/upload_file", body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["message"], "Only gz files allowed");
}

#[tokio::test]
async fn test_upload_rejects_empty_payload() {
    let app = TestApp::new().await;
    let body = xrd_form()
        .file("files", "scan.txt.gz", &gzip(b""))
        .finish();

    let response = app.post_multipart("/api/upload_file", body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["message"], "File is empty");
}

#[tokio::test]
async fn test_upload_rejects_unknown_test_type() {
    let app = TestApp::new().await;
    let body = MultipartBuilder::new()
        .text("test_type", "DILATOMETRY")
        .text("test_type_subcategory", "THERMAL")
        .text("instrument", "STADI P")
        .text("instrument_brand", "STOE")
        .file("files", "scan.txt.gz", &gzip(XRD_SAMPLE.as_bytes()))
        .finish();

    let response = app.post_multipart("/api/upload_file", body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(
        response.json()["message"]
            .as_str()
            .unwrap()
            .contains("not yet supported")
    );
}

#[tokio::test]
async fn test_upload_rejects_unsupported_combination() {
    let app = TestApp::new().await;
    // Known tokens, but XRD is not registered under the MPR extension.
    let body = xrd_form()
        .file("files", "scan.mpr.gz", &gzip(XRD_SAMPLE.as_bytes()))
        .finish();

    let response = app.post_multipart("/api/upload_file", body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json()["message"],
        "XRD test is not supported in MPR files."
    );
}

#[tokio::test]
async fn test_upload_rejects_unknown_extension() {
    let app = TestApp::new().await;
    let body = xrd_form()
        .file("files", "scan.csv.gz", &gzip(XRD_SAMPLE.as_bytes()))
        .finish();

    let response = app.post_multipart("/api/upload_file", body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let message = response.json()["message"].as_str().unwrap().to_string();
    assert!(message.starts_with("CSV extension not yet supported"));
}

#[tokio::test]
async fn test_upload_xrd_happy_path() {
    let app = TestApp::new().await;
    let body = xrd_form()
        .file("files", "scan.txt.gz", &gzip(XRD_SAMPLE.as_bytes()))
        .finish();

    let response = app.post_multipart("/api/upload_file", body).await;

    assert_eq!(response.status, StatusCode::OK);
    let envelope = response.json();
    assert_eq!(envelope["experiment_data"]["columns"][0], "2theta");
    assert_eq!(envelope["experiment_data"]["columns"][1], "intensity");
    assert_eq!(envelope["experiment_data"]["data"][1][1], 1.0);
    assert!(envelope.get("experiment_summary").is_none());

    // The converter removed its staged input.
    assert!(app.staged_files().is_empty());
}

#[tokio::test]
async fn test_upload_maccor_happy_path() {
    let app = TestApp::new().await;
    let body = MultipartBuilder::new()
        .text("test_type", "CHARGE-DISCHARGE")
        .text("test_type_subcategory", "GALVANOSTATIC CYCLING")
        .text("instrument", "S4000-WMG")
        .text("instrument_brand", "MACCOR")
        .file("files", "cell_42.txt.gz", &gzip(MACCOR_WMG_SAMPLE.as_bytes()))
        .finish();

    let response = app.post_multipart("/api/upload_file", body).await;

    assert_eq!(response.status, StatusCode::OK);
    let envelope = response.json();

    assert_eq!(envelope["experiment_info"]["data_format_model"], "S4000-WMG");
    // Current is serialized in mA.
    let columns = envelope["experiment_data"]["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    let current_idx = columns.iter().position(|c| c == "current").unwrap();
    assert_eq!(envelope["experiment_data"]["data"][0][current_idx], 500.0);

    // Summary indexed by cycle number, auxiliary table present.
    assert_eq!(envelope["experiment_summary"]["index"][0], 1);
    assert_eq!(envelope["auxiliary_table"]["columns"][1], "temperature");

    assert!(app.staged_files().is_empty());
}

#[tokio::test]
async fn test_upload_is_case_insensitive_at_the_boundary() {
    let app = TestApp::new().await;
    let body = MultipartBuilder::new()
        .text("test_type", "xrd")
        .text("instrument", "stadi p")
        .text("instrument_brand", "stoe")
        .file("files", "scan.txt.gz", &gzip(XRD_SAMPLE.as_bytes()))
        .finish();

    let response = app.post_multipart("/api/upload_file", body).await;

    assert_eq!(response.status, StatusCode::OK);
}
