mod error_handler;
mod request_metrics;
mod security;

pub use error_handler::report_errors;
pub use request_metrics::track_requests;
pub use security::security_headers;
