pub mod doc;
pub mod error;
pub mod health;
pub mod diagnostics;
pub mod messages;
pub mod user;

pub use doc::*;
pub use error::*;
pub use health::*;
pub use diagnostics::*;
pub use messages::*;
pub use user::*;
