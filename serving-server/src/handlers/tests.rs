//! Router-level tests over an in-memory feature store

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use feature_core::logic::pipeline::{process_records, train_on_snapshot, TrainingConfig};
use feature_core::{
    DriftConfig, ForestParams, InMemoryFeatureStore, RawRecord, ServingContext, Snapshot,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::Config;
use crate::{create_router, AppState};

fn cumings() -> RawRecord {
    RawRecord {
        passenger_id: 1,
        survived: Some(1),
        pclass: 1,
        name: Some("Cumings, Mrs. John Bradley (Florence Briggs Thayer)".to_string()),
        sex: Some("female".to_string()),
        age: Some(38.0),
        sib_sp: 1,
        parch: 0,
        ticket: Some("PC 17599".to_string()),
        fare: Some(71.2833),
        cabin: Some("C85".to_string()),
        embarked: Some("C".to_string()),
    }
}

fn braund() -> RawRecord {
    RawRecord {
        passenger_id: 2,
        survived: Some(0),
        pclass: 3,
        name: Some("Braund, Mr. Owen Harris".to_string()),
        sex: Some("male".to_string()),
        age: Some(22.0),
        sib_sp: 1,
        parch: 0,
        ticket: Some("A/5 21171".to_string()),
        fare: Some(7.25),
        cabin: None,
        embarked: Some("S".to_string()),
    }
}

fn cumings_request() -> Value {
    json!({
        "Pclass": 1,
        "Sex": "female",
        "Age": 38,
        "Fare": 71.2833,
        "Embarked": "C",
        "SibSp": 1,
        "Parch": 0,
        "Name": "Cumings, Mrs. John Bradley (Florence Briggs Thayer)",
        "Cabin": "C85",
    })
}

async fn app() -> Router {
    let store = Arc::new(InMemoryFeatureStore::new());
    process_records(&[cumings(), braund()], store.as_ref()).await.unwrap();

    let snapshot = Snapshot::load(store.as_ref()).await.unwrap();
    let training = TrainingConfig {
        params: ForestParams {
            n_trees: 5,
            bootstrap: false,
            ..ForestParams::default()
        },
        test_fraction: 0.0,
        ..TrainingConfig::default()
    };
    let artifact = train_on_snapshot(&snapshot, &training).unwrap();

    let ctx = ServingContext::bootstrap(store, artifact, DriftConfig::default())
        .await
        .unwrap();

    create_router(AppState {
        ctx: Arc::new(ctx),
        config: Arc::new(Config::from_lookup(|_| None).unwrap()),
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_context() {
    let (status, body) = send(app().await, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store_reachable"], true);
    assert_eq!(body["context"]["reference_rows"], 2);
    assert_eq!(body["context"]["store_backend"], "memory");
}

#[tokio::test]
async fn test_predict_known_passenger() {
    let (status, body) = send(app().await, post_json("/api/v1/predict", &cumings_request())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], 1);
    assert_eq!(body["survived"], true);
    assert_eq!(body["is_drift"], false);
    assert!(body["drift_p_values"]["Age"].is_number());
}

#[tokio::test]
async fn test_predict_missing_field_is_bad_request() {
    let mut request = cumings_request();
    request.as_object_mut().unwrap().remove("Age");

    let (status, body) = send(app().await, post_json("/api/v1/predict", &request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Age"));
}

#[tokio::test]
async fn test_predict_form_post() {
    let form = "Pclass=1&Sex=female&Age=38&Fare=71.2833&Embarked=C&SibSp=1&Parch=0\
                &Name=Cumings%2C+Mrs.+John+Bradley&Cabin=C85";
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();

    let (status, body) = send(app().await, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], 1);
}

#[tokio::test]
async fn test_entity_features_and_prediction() {
    let app = app().await;

    let (status, body) = send(app.clone(), get("/api/v1/entities/2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entity_id"], "2");
    assert_eq!(body["features"]["Pclass"], 3.0);
    assert_eq!(body["features"]["Survived"], 0.0);

    let (status, body) = send(app, get("/api/v1/entities/1/predict")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entity_id"], "1");
    assert_eq!(body["prediction"], 1);
}

#[tokio::test]
async fn test_unknown_entity_is_not_found() {
    let app = app().await;

    let (status, _) = send(app.clone(), get("/api/v1/entities/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(app, get("/api/v1/entities/999/predict")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
