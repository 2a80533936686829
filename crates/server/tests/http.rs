use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use chrono::NaiveDate;
use rtl_report::{ensure_fonts, AssetPaths, Branding, FixedClock, ReportRenderer};
use rtl_report_server::{router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
];

fn test_font() -> Option<PathBuf> {
    let bundled = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../assets")
        .join(rtl_report::fonts::REGULAR_FONT_FILE);
    std::iter::once(bundled)
        .chain(std::env::var_os("RTL_REPORT_TEST_FONT").map(PathBuf::from))
        .chain(FALLBACK_FONTS.iter().map(PathBuf::from))
        .find(|path| path.is_file())
}

fn app() -> Option<axum::Router> {
    let font = test_font()?;
    let fonts = ensure_fonts(&font, None).expect("register test font");
    let assets = AssetPaths::new(std::env::temp_dir().join("rtl-report-no-assets"));
    let renderer = ReportRenderer::new(fonts, assets, Branding::default());
    let clock = FixedClock::on(NaiveDate::from_ymd_opt(2024, 9, 3).expect("valid date"));
    Some(router(AppState::with_clock(renderer, Arc::new(clock))))
}

fn form_request(uri: &str, fields: &[(String, String)]) -> Request<Body> {
    let body = serde_urlencoded::to_string(fields).expect("encode form");
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("request")
}

fn form(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn detail(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body: Value = serde_json::from_slice(&bytes).expect("json error body");
    body["detail"].as_str().expect("detail").to_string()
}

#[tokio::test]
async fn weekly_form_returns_a_pdf_attachment() {
    let Some(app) = app() else {
        eprintln!("Skipping weekly_form_returns_a_pdf_attachment: no Arabic font found. Set RTL_REPORT_TEST_FONT.");
        return;
    };

    let mut fields = form(&[("period", "الفصل الأول"), ("week", "1"), ("term", "1446")]);
    for day in ["sun", "mon", "tue"] {
        for suffix in ["class", "activity", "note"] {
            fields.push((format!("{day}_{suffix}"), String::new()));
        }
    }

    let response = app
        .oneshot(form_request("/api/pdf/weekly", &fields))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .expect("ascii header");
    assert!(disposition.starts_with("attachment; filename*=UTF-8''%D8%B3"));
    assert!(disposition.ends_with("_20240903_000000.pdf"));

    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn default_endpoint_renders_rounds_and_ignores_broken_rows() {
    let Some(app) = app() else {
        eprintln!("Skipping default_endpoint_renders_rounds_and_ignores_broken_rows: no Arabic font found.");
        return;
    };

    let response = app
        .oneshot(form_request("/api/pdf", &form(&[("rows_json", "{not json")])))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .expect("ascii header");
    // تقرير_الجولات
    assert!(disposition.contains("%D8%AA%D9%82%D8%B1%D9%8A%D8%B1_"));
}

#[tokio::test]
async fn attendance_rejects_malformed_rows() {
    let Some(app) = app() else {
        eprintln!("Skipping attendance_rejects_malformed_rows: no Arabic font found.");
        return;
    };

    let response = app
        .oneshot(json_request("/api/pdf/attendance", json!({ "rows": [1, 2] })))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(detail(response).await.contains("row 0"));
}

#[tokio::test]
async fn attendance_accepts_json_rows() {
    let Some(app) = app() else {
        eprintln!("Skipping attendance_accepts_json_rows: no Arabic font found.");
        return;
    };

    let body = json!({
        "rows": [
            { "name": "نورة", "reason": "إجازة" },
            { "name": "سارة", "reason": 3 },
        ]
    });
    let response = app
        .oneshot(json_request("/api/pdf/attendance", body))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_templates_are_not_found() {
    let Some(app) = app() else {
        eprintln!("Skipping unknown_templates_are_not_found: no Arabic font found.");
        return;
    };

    let response = app
        .oneshot(form_request("/api/pdf/monthly", &[]))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(detail(response).await.contains("monthly"));
}
