pub mod diagnostics;
pub mod envelope;
pub mod error;
pub mod health;

pub use diagnostics::*;
pub use envelope::*;
pub use error::*;
pub use health::*;
