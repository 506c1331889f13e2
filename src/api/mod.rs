pub mod handlers;
pub mod routes;

pub use handlers::{error_response, ErrorResponse};
pub use routes::create_api_router;
