use std::sync::Arc;

use ports_service::models::{DataResponse, Port};
use ports_service::routes::ports::{create_port, get_port};
use ports_service::test_support::{InMemoryPortRepository, TestRocketBuilder};
use rocket::http::{ContentType, Status};
use rocket::local::blocking::Client;
use rocket::routes;
use serde_json::Value;

const CHANGSHU: &str = r#"{
    "name": "China",
    "city": "Changshu",
    "country": "China",
    "alias": ["Zhangjiagang", "Suzhou", "Taicang"],
    "regions": ["Region1", "Region2"],
    "coordinates": [120.752503, 31.653686],
    "province": "Jiangsu",
    "timezone": "Asia/Shanghai",
    "unlocs": ["cncgu"],
    "code": "57076"
}"#;

fn client_with(repository: Arc<InMemoryPortRepository>) -> Client {
    TestRocketBuilder::new()
        .mount_api_routes(routes![create_port, get_port])
        .manage_repository(repository)
        .blocking_client()
}

fn client() -> (Client, Arc<InMemoryPortRepository>) {
    let repository = Arc::new(InMemoryPortRepository::new());
    (client_with(repository.clone()), repository)
}

#[test]
fn create_then_get_round_trips() {
    let (client, repository) = client();

    let response = client
        .post("/api/v1/ports")
        .header(ContentType::JSON)
        .body(CHANGSHU)
        .dispatch();
    assert_eq!(response.status(), Status::Ok);

    let created: DataResponse<Port> = response.into_json().expect("valid JSON payload");
    assert_eq!(created.data.id.as_deref(), Some("CNCGU"));
    assert_eq!(created.data.city, "Changshu");
    assert_eq!(created.data.coordinates, Some([120.752503, 31.653686]));
    assert_eq!(repository.flushed_ids(), vec![vec!["CNCGU".to_string()]]);

    let response = client.get("/api/v1/ports/cncgu").dispatch();
    assert_eq!(response.status(), Status::Ok);

    let fetched: DataResponse<Port> = response.into_json().expect("valid JSON payload");
    assert_eq!(fetched.data, created.data);
}

#[test]
fn create_replaces_existing_port() {
    let (client, repository) = client();

    let renamed = CHANGSHU.replace("Changshu", "Suzhou");
    for body in [CHANGSHU, renamed.as_str()] {
        let response = client
            .post("/api/v1/ports")
            .header(ContentType::JSON)
            .body(body)
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
    }

    let stored = repository.snapshot();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored["CNCGU"].city, "Suzhou");
}

#[test]
fn create_without_unlocs_is_bad_request() {
    let (client, repository) = client();

    let response = client
        .post("/api/v1/ports")
        .header(ContentType::JSON)
        .body(r#"{"name": "Nowhere", "unlocs": []}"#)
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let payload: Value = response.into_json().expect("valid JSON payload");
    assert_eq!(payload["error"], "BadRequest");
    assert_eq!(repository.attempts(), 0);
}

#[test]
fn blank_first_unloc_is_bad_request() {
    let (client, repository) = client();

    let response = client
        .post("/api/v1/ports")
        .header(ContentType::JSON)
        .body(r#"{"name": "Changshu", "unlocs": ["", "CNCGU"]}"#)
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);
    assert!(repository.snapshot().is_empty());
}

#[test]
fn malformed_body_is_bad_request() {
    let (client, _) = client();

    let response = client
        .post("/api/v1/ports")
        .header(ContentType::JSON)
        .body(r#"{"name": "#)
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let payload: Value = response.into_json().expect("valid JSON payload");
    assert_eq!(payload["message"], "invalid request");
}

#[test]
fn unknown_port_is_not_found() {
    let (client, _) = client();

    let response = client.get("/api/v1/ports/NOPE").dispatch();
    assert_eq!(response.status(), Status::NotFound);

    let payload: Value = response.into_json().expect("valid JSON payload");
    assert_eq!(payload["error"], "NotFound");
}

#[test]
fn repository_failure_hides_details() {
    let client = client_with(Arc::new(InMemoryPortRepository::failing_from(1)));

    let response = client
        .post("/api/v1/ports")
        .header(ContentType::JSON)
        .body(CHANGSHU)
        .dispatch();
    assert_eq!(response.status(), Status::InternalServerError);

    let payload: Value = response.into_json().expect("valid JSON payload");
    assert_eq!(payload["message"], "internal server error");
}
