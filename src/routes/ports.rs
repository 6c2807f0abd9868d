//! Port endpoints: single-record upsert and lookup by id.

use rocket::State;
use rocket::serde::json::{self, Json};
use rocket_okapi::openapi;

use crate::error::ApiError;
use crate::models::{DataResponse, Port};
use crate::service::PortService;

/// Create or replace a port.
///
/// The id is the first entry of `unlocs`, upper-cased; any `id` in the body is
/// ignored.
#[openapi(tag = "Ports")]
#[post("/ports", data = "<payload>")]
pub async fn create_port(
    payload: Result<Json<Port>, json::Error<'_>>,
    service: &State<PortService>,
) -> Result<Json<DataResponse<Port>>, ApiError> {
    let Json(port) = payload.map_err(|err| {
        log::debug!("rejected port payload: {:?}", err);
        ApiError::BadRequest("invalid request".to_string())
    })?;

    let port = service.create_or_update(port).await?;
    log::info!(
        "stored port {}",
        port.id.as_deref().unwrap_or_default()
    );

    Ok(Json(DataResponse { data: port }))
}

/// Look up a port by id, ignoring case.
#[openapi(tag = "Ports")]
#[get("/ports/<id>")]
pub async fn get_port(
    id: &str,
    service: &State<PortService>,
) -> Result<Json<DataResponse<Port>>, ApiError> {
    let port = service.find_by_id(id).await?;
    Ok(Json(DataResponse { data: port }))
}
