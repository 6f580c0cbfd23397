pub mod backend;
pub mod client;
#[cfg(any(test, feature = "test-utils"))]
pub mod scripted;
