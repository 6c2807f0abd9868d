use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::StatusClass;
use rocket::{Data, Request, Response};
use std::time::Instant;

/// Fairing that logs one line per request: method, path, status and latency.
/// Server errors are logged at `warn`.
pub struct RequestLogger;

/// Start time stashed in the request-local cache.
struct RequestStart(Instant);

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(|| RequestStart(Instant::now()));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let elapsed_ms = request
            .local_cache(|| RequestStart(Instant::now()))
            .0
            .elapsed()
            .as_secs_f64()
            * 1000.0;
        let status = response.status();

        let level = if status.class() == StatusClass::ServerError {
            log::Level::Warn
        } else {
            log::Level::Info
        };

        log::log!(
            level,
            "{} {} -> {} ({:.2}ms)",
            request.method(),
            request.uri().path(),
            status.code,
            elapsed_ms
        );
    }
}
