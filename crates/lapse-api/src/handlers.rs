//! Request handlers.

pub mod download;
pub mod health;
pub mod timelapse;
pub mod upload;

pub use download::*;
pub use health::*;
pub use timelapse::*;
pub use upload::*;
