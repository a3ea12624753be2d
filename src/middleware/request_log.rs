use std::time::Instant;

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

pub const PROCESS_TIME_HEADER: &str = "x-process-time";

/// Logs every call and reports its duration (seconds) in `X-Process-Time`
pub async fn request_log_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let mut response = next.run(request).await;

    let process_time = format!("{:.3}", start.elapsed().as_secs_f64());
    if let Ok(value) = HeaderValue::from_str(&process_time) {
        response.headers_mut().insert(PROCESS_TIME_HEADER, value);
    }

    tracing::info!(
        "Method={} Path={} StatusCode={} ProcessTime={}",
        method,
        path,
        response.status().as_u16(),
        process_time
    );

    response
}
