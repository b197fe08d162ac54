mod http;
mod plan;
mod session;
mod traits;

pub use http::HttpService;
pub use plan::{execute_plan, PlanError};
pub use session::{Session, TokenStore};
pub use traits::{ApiOp, ServiceError, WorkflowApi};
