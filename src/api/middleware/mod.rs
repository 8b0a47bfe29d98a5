pub mod request_id;
pub mod timing;

pub use request_id::{RequestId, RequestIdMiddleware, ServiceIdentity, generate_request_id};
pub use timing::TimingMiddleware;
