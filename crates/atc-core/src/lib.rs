mod error;
mod session;

pub use error::{CoreError, CoreResult};
pub use session::{Session, SessionStatus};
