mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{json, Value};

use common::{money, seeded_store, send, FakeGateway, TestApp, END, START};

fn cart(quantity: u32) -> Value {
    json!({
        "start_date": START,
        "end_date": END,
        "items": [
            { "location_id": "loc-1", "category": "Boxes", "size": "Medium", "quantity": quantity }
        ]
    })
}

fn schedule(duration: &str) -> Value {
    json!({ "start_date": START, "end_date": END, "duration": duration })
}

fn pickup() -> Value {
    json!({
        "address": "Jl. Raya Kuta 12",
        "geolocation": { "latitude": -8.72, "longitude": 115.17 },
        "contact_number": "+62 812-3456-7890"
    })
}

#[actix_rt::test]
async fn test_wizard_walkthrough_with_pickup_and_voucher() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/drafts")
        .set_json(cart(2))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["step"], "schedule");
    assert_eq!(body["step_number"], 1);
    assert_eq!(money(&body["totals"]["final_price"]), 0.0);
    let id = body["draft_id"].as_str().unwrap().to_string();

    // 2 units x $5 x 3 days
    let req = test::TestRequest::put()
        .uri(&format!("/api/drafts/{}/schedule", id))
        .set_json(schedule("Daily"))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&body["totals"]["sub_total"]), 30.0);

    let req = test::TestRequest::post()
        .uri(&format!("/api/drafts/{}/next", id))
        .to_request();
    let (_, body) = send(&app, req).await;
    assert_eq!(body["step"], "service");
    assert_eq!(body["step_number"], 2);

    let req = test::TestRequest::put()
        .uri(&format!("/api/drafts/{}/service", id))
        .set_json(json!({ "service_type": "pickup" }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&format!("/api/drafts/{}/next", id))
        .to_request();
    let (_, body) = send(&app, req).await;
    assert_eq!(body["step"], "pickup_details");
    assert_eq!(body["step_number"], 2);

    let req = test::TestRequest::put()
        .uri(&format!("/api/drafts/{}/pickup", id))
        .set_json(pickup())
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "confirmation");
    assert_eq!(body["step_number"], 3);
    assert_eq!(money(&body["totals"]["pickup_fee"]), 10.0);
    assert_eq!(money(&body["totals"]["final_price"]), 40.0);

    let req = test::TestRequest::put()
        .uri(&format!("/api/drafts/{}/voucher", id))
        .set_json(json!({ "code": " spring10 " }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&body["totals"]["discount_amount"]), 4.0);
    assert_eq!(money(&body["totals"]["final_price"]), 36.0);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/drafts/{}/voucher", id))
        .to_request();
    let (_, body) = send(&app, req).await;
    assert_eq!(money(&body["totals"]["final_price"]), 40.0);
}

#[actix_rt::test]
async fn test_next_requires_duration() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/drafts")
        .set_json(cart(1))
        .to_request();
    let (_, body) = send(&app, req).await;
    let id = body["draft_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/drafts/{}/next", id))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "select a duration first");

    // the rejected transition leaves the draft where it was
    let req = test::TestRequest::get()
        .uri(&format!("/api/drafts/{}", id))
        .to_request();
    let (_, body) = send(&app, req).await;
    assert_eq!(body["step"], "schedule");
}

#[actix_rt::test]
async fn test_missing_rate_blocks_progress() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/drafts")
        .set_json(cart(1))
        .to_request();
    let (_, body) = send(&app, req).await;
    let id = body["draft_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::put()
        .uri(&format!("/api/drafts/{}/schedule", id))
        .set_json(schedule("Weekly"))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["issues"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::post()
        .uri(&format!("/api/drafts/{}/next", id))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_mutations_outside_their_step_conflict() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/drafts")
        .set_json(cart(1))
        .to_request();
    let (_, body) = send(&app, req).await;
    let id = body["draft_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::put()
        .uri(&format!("/api/drafts/{}/service", id))
        .set_json(json!({ "service_type": "self-dropoff" }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri(&format!("/api/drafts/{}/back", id))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_rt::test]
async fn test_back_from_confirmation_lands_on_service() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/drafts")
        .set_json(cart(1))
        .to_request();
    let (_, body) = send(&app, req).await;
    let id = body["draft_id"].as_str().unwrap().to_string();

    let steps = [
        test::TestRequest::put()
            .uri(&format!("/api/drafts/{}/schedule", id))
            .set_json(schedule("Monthly")),
        test::TestRequest::post().uri(&format!("/api/drafts/{}/next", id)),
        test::TestRequest::put()
            .uri(&format!("/api/drafts/{}/service", id))
            .set_json(json!({ "service_type": "self-dropoff" })),
        test::TestRequest::post().uri(&format!("/api/drafts/{}/next", id)),
    ];
    for req in steps {
        let (status, _) = send(&app, req.to_request()).await;
        assert_eq!(status, StatusCode::OK);
    }

    let req = test::TestRequest::post()
        .uri(&format!("/api/drafts/{}/back", id))
        .to_request();
    let (_, body) = send(&app, req).await;
    assert_eq!(body["step"], "service");
    assert_eq!(money(&body["totals"]["final_price"]), 90.0);
}

#[actix_rt::test]
async fn test_create_draft_rejections() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/drafts")
        .set_json(cart(11))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/drafts")
        .set_json(json!({ "start_date": START, "end_date": END, "items": [] }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no storage selected");

    let req = test::TestRequest::post()
        .uri("/api/drafts")
        .set_json(json!({
            "start_date": START,
            "end_date": END,
            "items": [{ "location_id": "nowhere", "category": "Boxes", "size": "Medium", "quantity": 1 }]
        }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/api/drafts")
        .set_json(json!({ "start_date": END, "end_date": START, "items": [] }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_voucher_rejections_leave_totals_alone() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/drafts")
        .set_json(cart(1))
        .to_request();
    let (_, body) = send(&app, req).await;
    let id = body["draft_id"].as_str().unwrap().to_string();

    for (code, expected) in [
        ("NOPE", StatusCode::NOT_FOUND),
        ("EXPIRED", StatusCode::UNPROCESSABLE_ENTITY),
        ("LOC2ONLY", StatusCode::UNPROCESSABLE_ENTITY),
    ] {
        let req = test::TestRequest::put()
            .uri(&format!("/api/drafts/{}/voucher", id))
            .set_json(json!({ "code": code }))
            .to_request();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, expected, "voucher {}", code);
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/drafts/{}", id))
        .to_request();
    let (_, body) = send(&app, req).await;
    assert!(body["draft"]["voucher"].is_null());
}

#[actix_rt::test]
async fn test_local_price_without_rate_source() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/drafts")
        .set_json(cart(1))
        .to_request();
    let (_, body) = send(&app, req).await;
    let id = body["draft_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/drafts/{}/local-price", id))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unavailable");
    assert_eq!(money(&body["usd"]), 0.0);
}

#[actix_rt::test]
async fn test_discarded_draft_is_gone() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/drafts")
        .set_json(cart(1))
        .to_request();
    let (_, body) = send(&app, req).await;
    let id = body["draft_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::delete()
        .uri(&format!("/api/drafts/{}", id))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/api/drafts/{}", id))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(test_app.state.drafts.is_empty());
}

#[actix_rt::test]
async fn test_idle_draft_expires_and_is_evicted() {
    // every draft is idle past a zero TTL as soon as it is stored
    let test_app =
        TestApp::with_draft_ttl(seeded_store(), FakeGateway::default(), chrono::Duration::zero());
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/drafts")
        .set_json(cart(1))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["draft_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/drafts/{}", id))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = test::TestRequest::put()
        .uri(&format!("/api/drafts/{}/schedule", id))
        .set_json(schedule("Monthly"))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // creating the next draft sweeps the expired one out
    let req = test::TestRequest::post()
        .uri("/api/drafts")
        .set_json(cart(1))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(test_app.state.drafts.len(), 1);
}

#[actix_rt::test]
async fn test_invalid_bearer_token_is_rejected() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/drafts")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .set_json(cart(1))
        .to_request();
    let status = match test::try_call_service(&app, req).await {
        Ok(resp) => resp.status(),
        Err(err) => err.as_response_error().status_code(),
    };
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(test_app.state.drafts.is_empty());
}
