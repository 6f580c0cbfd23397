pub mod lenient;
pub mod text;
pub mod threads;
