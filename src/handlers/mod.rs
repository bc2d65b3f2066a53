//! 핸들러 모듈

pub mod connection;
pub mod drawing;
pub mod room;

pub use connection::*;
pub use drawing::*;
pub use room::*;
