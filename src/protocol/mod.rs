//! 와이어 프로토콜

mod messages;

pub use messages::*;
