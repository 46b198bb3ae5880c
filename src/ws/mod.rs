pub mod admission;
pub mod rooms;
pub mod session;
