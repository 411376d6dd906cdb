pub mod auth;
pub mod docs;
pub mod health;
pub mod diagnostics;

pub use auth::*;
pub use docs::*;
pub use health::*;
pub use diagnostics::*;
