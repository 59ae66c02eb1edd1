pub mod articles;
pub mod error;
