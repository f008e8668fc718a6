//! Wire format and HTTP conversion of `ApiResult`.

use api_result::{ApiResult, StatusCode};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Product {
    name: String,
    price_cents: i64,
}

fn lamp() -> Product {
    Product {
        name: "lamp".to_string(),
        price_cents: 1999,
    }
}

#[test]
fn test_success_wire_shape() {
    let body = serde_json::to_value(ApiResult::success(lamp())).unwrap();

    assert_eq!(
        body,
        json!({
            "data": { "name": "lamp", "price_cents": 1999 },
            "isSuccessful": true,
            "statusCode": 200,
            "errorMessages": null
        })
    );
}

#[test]
fn test_failure_wire_shape() {
    let body = serde_json::to_value(ApiResult::<Product>::not_found()).unwrap();

    assert_eq!(
        body,
        json!({
            "data": null,
            "isSuccessful": false,
            "statusCode": 404,
            "errorMessages": ["Resource not found"]
        })
    );
}

#[test]
fn test_round_trip_preserves_fields() {
    let results = vec![
        ApiResult::success(lamp()),
        ApiResult::unauthorized(),
        ApiResult::failure_many(StatusCode::BAD_REQUEST, ["name is required", "price too low"]),
    ];

    for original in results {
        let text = serde_json::to_string(&original).unwrap();
        let decoded: ApiResult<Product> = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, original);
    }
}

#[test]
fn test_success_without_payload_round_trips() {
    let original: ApiResult<Option<Product>> = ApiResult::success(None);
    let text = serde_json::to_string(&original).unwrap();
    assert!(text.contains("\"data\":null"));

    let decoded: ApiResult<Option<Product>> = serde_json::from_str(&text).unwrap();
    assert_eq!(decoded, original);
    assert_eq!(decoded.data(), Some(&None));
}

#[test]
fn test_unit_payload_round_trips() {
    let original = ApiResult::success(());
    let text = serde_json::to_string(&original).unwrap();

    let decoded: ApiResult<()> = serde_json::from_str(&text).unwrap();
    assert_eq!(decoded, original);
    assert_eq!(decoded.into_data(), Some(()));

    let failed: ApiResult<()> = ApiResult::not_found();
    let decoded: ApiResult<()> =
        serde_json::from_str(&serde_json::to_string(&failed).unwrap()).unwrap();
    assert_eq!(decoded, failed);
    assert!(decoded.data().is_none());
}

#[test]
fn test_null_data_stays_empty_for_struct_payloads() {
    let decoded: ApiResult<Product> = serde_json::from_value(json!({
        "data": null,
        "isSuccessful": true,
        "statusCode": 204,
        "errorMessages": null
    }))
    .unwrap();

    assert!(decoded.is_successful());
    assert!(decoded.data().is_none());
}

#[test]
fn test_deserialize_rejects_broken_invariant() {
    let payloads = [
        json!({ "data": 1, "isSuccessful": true, "statusCode": 200, "errorMessages": ["oops"] }),
        json!({ "data": 1, "isSuccessful": false, "statusCode": 500, "errorMessages": ["oops"] }),
        json!({ "data": null, "isSuccessful": false, "statusCode": 500, "errorMessages": null }),
        json!({ "data": null, "isSuccessful": false, "statusCode": 500, "errorMessages": [] }),
    ];

    for payload in payloads {
        let decoded = serde_json::from_value::<ApiResult<i32>>(payload.clone());
        assert!(decoded.is_err(), "accepted {payload}");
    }
}

#[tokio::test]
async fn test_into_response_uses_status_code() {
    let response = ApiResult::<Product>::forbidden().into_response();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["isSuccessful"], json!(false));
    assert_eq!(body["statusCode"], json!(403));
    assert_eq!(body["errorMessages"], json!(["Forbidden access"]));
}

#[tokio::test]
async fn test_success_response_is_200() {
    let response = ApiResult::from(lamp()).into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["data"]["name"], json!("lamp"));
}
