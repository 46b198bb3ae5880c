pub mod collab;
pub mod diagnostics;
pub mod health;

pub use collab::*;
pub use diagnostics::*;
pub use health::*;
