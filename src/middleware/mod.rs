pub mod auth;
pub mod request_id;

pub use auth::AuthUser;
pub use auth::USER_ID_HEADER;
pub use request_id::make_span_with_request_id;
pub use request_id::request_id_middleware;
pub use request_id::RequestId;
pub use request_id::REQUEST_ID_HEADER;
