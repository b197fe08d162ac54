pub mod dashboard;
pub mod debounce;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod forms;
pub mod guard;
pub mod idea;
pub mod modal;
pub mod task;
pub mod user;

pub use dispatch::{DispatchTable, TaskKind};
pub use error::ValidationError;
pub use idea::{Idea, IdeaStatus, Priority};
pub use task::{Task, TaskDetails};
pub use user::CurrentUser;
