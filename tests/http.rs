//! End-to-end tests of the HTTP surface.
//!
//! A MockExtractor stands in for Typless so the full upload → render → save
//! flow runs without network access.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use docintake_lib::db::Db;
use docintake_lib::encode::decode_file;
use docintake_lib::error::{IntakeError, Result};
use docintake_lib::extract::Extractor;
use docintake_lib::routes::{build_router, AppState};
use docintake_lib::types::{ExtractionRequest, ExtractionResult};

const BOUNDARY: &str = "X-INTAKE-TEST-BOUNDARY";

enum Reply {
    Json(Value),
    Fail(u16, &'static str),
}

struct MockExtractor {
    reply: Reply,
    seen: Mutex<Vec<ExtractionRequest>>,
}

impl MockExtractor {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(MockExtractor {
            reply,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl Extractor for MockExtractor {
    fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult> {
        self.seen.lock().unwrap().push(request.clone());
        match &self.reply {
            Reply::Json(v) => ExtractionResult::from_json(v.clone()),
            Reply::Fail(status, body) => Err(IntakeError::Upstream {
                status: *status,
                body: body.to_string(),
            }),
        }
    }
}

fn app(extractor: Arc<MockExtractor>) -> (Router, Arc<Db>) {
    app_with_limit(extractor, 10 * 1024 * 1024)
}

fn app_with_limit(extractor: Arc<MockExtractor>, max_upload_bytes: usize) -> (Router, Arc<Db>) {
    let db = Arc::new(Db::open_in_memory().unwrap());
    let state = Arc::new(AppState {
        extractor,
        db: db.clone(),
    });
    (build_router(state, max_upload_bytes), db)
}

fn invoice_result() -> Value {
    json!({
        "file_name": "invoice.pdf",
        "object_id": "5f8d0d55-0000",
        "extracted_fields": [
            {"name": "supplier", "data_type": "AUTHOR", "values": [
                {"value": "Auto Servis d.o.o.", "confidence_score": 0.5, "page_number": 0, "x": 10, "y": 20, "width": 100, "height": 12}
            ]},
            {"name": "invoice_number", "data_type": "STRING", "values": []},
            {"name": "total_amount", "data_type": "NUMBER", "values": [
                {"value": "120.50", "confidence_score": 1.0}
            ]}
        ],
        "line_items": [
            [
                {"name": "product_number", "values": [{"value": "BP-22", "confidence_score": 0.9}]},
                {"name": "product_description", "values": [{"value": "Brake pads", "confidence_score": 0.9}]},
                {"name": "quantity", "values": [{"value": "12.345", "confidence_score": 0.9}]},
                {"name": "price", "values": [{"value": "9.999", "confidence_score": 0.9}]}
            ],
            [
                {"name": "product_description", "values": [{"value": "Labour", "confidence_score": 0.8}]},
                {"name": "price", "values": [{"value": "40", "confidence_score": 0.8}]}
            ]
        ]
    })
}

fn multipart_body(doc_type: Option<&str>, file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(t) = doc_type {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"doc_type\"\r\n\r\n{t}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, content)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn process_request(doc_type: Option<&str>, file: Option<(&str, &[u8])>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/process")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(doc_type, file)))
        .unwrap()
}

fn percent_encode(s: &str) -> String {
    s.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

fn save_request(doc: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/save")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("doc={}", percent_encode(doc))))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// The JSON payload the result card posts back to /save.
fn hidden_doc(html: &str) -> String {
    let marker = "name=\"doc\" value=\"";
    let start = html.find(marker).expect("hidden doc input") + marker.len();
    let end = start + html[start..].find('"').unwrap();
    quick_xml::escape::unescape(&html[start..end])
        .unwrap()
        .into_owned()
}

#[tokio::test]
async fn index_renders_upload_form() {
    let (app, _) = app(MockExtractor::new(Reply::Json(json!({}))));
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, html) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("DigitalCarBook intake"));
    assert!(html.contains("name=\"doc_type\""));
    assert!(html.contains("value=\"registration-card\""));
}

#[tokio::test]
async fn unknown_route_renders_not_found() {
    let (app, _) = app(MockExtractor::new(Reply::Json(json!({}))));
    let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
    let (status, html) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.contains("We could not find that page :("));
}

#[tokio::test]
async fn health_is_ok() {
    let (app, _) = app(MockExtractor::new(Reply::Json(json!({}))));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    assert_eq!(send(&app, request).await, (StatusCode::OK, "ok".to_string()));
}

#[tokio::test]
async fn process_renders_fields_and_line_items() {
    let mock = MockExtractor::new(Reply::Json(invoice_result()));
    let (app, db) = app(mock.clone());
    let pdf: &[u8] = b"%PDF-1.4\n\x00\x01binary body";

    let (status, html) = send(&app, process_request(Some("simple-invoice"), Some(("invoice.pdf", pdf)))).await;
    assert_eq!(status, StatusCode::OK);

    let seen = mock.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].document_type_name, "simple-invoice");
    assert_eq!(seen[0].file_name, "invoice.pdf");
    assert_eq!(decode_file(&seen[0].file).unwrap(), pdf.to_vec());

    assert!(html.contains("Document uploaded successfully"));
    assert!(html.contains("<h2>invoice.pdf</h2>"));
    assert!(html.contains("Content type: simple-invoice"));

    let supplier = html.find("<h5>supplier</h5>").unwrap();
    let number = html.find("<h5>invoice_number</h5>").unwrap();
    let total = html.find("<h5>total_amount</h5>").unwrap();
    assert!(supplier < number && number < total);
    assert!(html.contains("<td>Auto Servis d.o.o.</td><td>50.00%</td>"));
    assert!(html.contains("<td>120.50</td><td>100.00%</td>"));

    assert!(html.contains("<td>BP-22</td><td>Brake pads</td><td>12.35</td><td>10.00</td>"));
    assert!(html.contains("<td></td><td>Labour</td><td></td><td>40.00</td>"));

    // Nothing is stored until the user confirms.
    assert_eq!(db.count().unwrap(), 0);
}

#[tokio::test]
async fn upstream_error_renders_error_card_without_save() {
    let mock = MockExtractor::new(Reply::Fail(500, "rate limited"));
    let (app, db) = app(mock.clone());

    let (status, html) = send(&app, process_request(Some("receipt"), Some(("r.jpg", b"jpeg".as_slice())))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Failed to process the file"));
    assert!(html.contains("rate limited"));
    assert!(!html.contains("name=\"doc\""));
    assert!(!html.contains("save_button"));
    assert_eq!(mock.calls(), 1);
    assert_eq!(db.count().unwrap(), 0);
}

#[tokio::test]
async fn unknown_document_type_is_rejected_before_extraction() {
    let mock = MockExtractor::new(Reply::Json(invoice_result()));
    let (app, _) = app(mock.clone());
    let (status, _) = send(&app, process_request(Some("passport"), Some(("p.png", b"png".as_slice())))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn missing_file_is_rejected() {
    let mock = MockExtractor::new(Reply::Json(invoice_result()));
    let (app, _) = app(mock.clone());
    let (status, body) = send(&app, process_request(Some("receipt"), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("No file provided"));
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn confirmed_results_are_saved_as_new_records() {
    let mock = MockExtractor::new(Reply::Json(invoice_result()));
    let (app, db) = app(mock);

    let (_, first) = send(&app, process_request(Some("simple-invoice"), Some(("a.pdf", b"first".as_slice())))).await;
    let (_, second) = send(&app, process_request(Some("receipt"), Some(("b.pdf", b"second".as_slice())))).await;
    let first_doc = hidden_doc(&first);
    let second_doc = hidden_doc(&second);

    let (status, html) = send(&app, save_request(&first_doc)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(html, "<button disabled>Saved</button>");
    let (status, _) = send(&app, save_request(&second_doc)).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(db.count().unwrap(), 2);
    let a = db.get(1).unwrap().unwrap();
    let b = db.get(2).unwrap().unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(a.filename, "a.pdf");
    assert_eq!(a.document_type, "simple-invoice");
    assert_eq!(decode_file(&a.content_b64).unwrap(), b"first".to_vec());
    assert_eq!(b.filename, "b.pdf");
    assert_eq!(b.document_type, "receipt");

    let stored: Value = serde_json::from_str(&a.result).unwrap();
    assert_eq!(stored, invoice_result());
}

#[tokio::test]
async fn save_rejects_payload_without_extraction_result() {
    let (app, db) = app(MockExtractor::new(Reply::Json(json!({}))));

    let (status, _) = send(&app, save_request("not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let doc = json!({
        "filename": "a.pdf",
        "document_type": "receipt",
        "content_b64": "YQ==",
        "result": "[1, 2, 3]"
    })
    .to_string();
    let (status, _) = send(&app, save_request(&doc)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(db.count().unwrap(), 0);
}

#[tokio::test]
async fn client_supplied_id_is_ignored() {
    let (app, db) = app(MockExtractor::new(Reply::Json(json!({}))));
    let doc = |id: Option<i64>| {
        let mut doc = json!({
            "filename": "a.pdf",
            "document_type": "receipt",
            "content_b64": "YQ==",
            "result": "{\"extracted_fields\": []}"
        });
        if let Some(id) = id {
            doc["id"] = json!(id);
        }
        doc.to_string()
    };

    assert_eq!(send(&app, save_request(&doc(Some(i64::MAX)))).await.0, StatusCode::OK);
    assert_eq!(send(&app, save_request(&doc(None))).await.0, StatusCode::OK);
    assert_eq!(send(&app, save_request(&doc(Some(1)))).await.0, StatusCode::OK);

    assert_eq!(db.count().unwrap(), 3);
    assert!(db.get(i64::MAX).unwrap().is_none());
    for id in 1..=3 {
        assert_eq!(db.get(id).unwrap().unwrap().id, Some(id));
    }
}

#[tokio::test]
async fn upload_near_the_limit_can_still_be_saved() {
    let limit = 64 * 1024;
    let (app, db) = app_with_limit(MockExtractor::new(Reply::Json(invoice_result())), limit);
    let scan: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();

    let (status, html) = send(&app, process_request(Some("simple-invoice"), Some(("scan.pdf", scan.as_slice())))).await;
    assert_eq!(status, StatusCode::OK);
    let doc = hidden_doc(&html);
    assert!(doc.len() > limit);

    let (status, _) = send(&app, save_request(&doc)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(db.count().unwrap(), 1);
    let saved = db.get(1).unwrap().unwrap();
    assert_eq!(decode_file(&saved.content_b64).unwrap(), scan);
}

#[tokio::test]
async fn save_rejects_content_that_is_not_base64() {
    let (app, db) = app(MockExtractor::new(Reply::Json(json!({}))));
    let doc = json!({
        "filename": "a.pdf",
        "document_type": "receipt",
        "content_b64": "not base64!",
        "result": "{}"
    })
    .to_string();
    let (status, body) = send(&app, save_request(&doc)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("invalid base64 content"));
    assert_eq!(db.count().unwrap(), 0);
}
