pub mod middleware;
pub mod token;

pub use middleware::{Admin, ProjectUploader};
