pub mod exchange;
pub mod metadata;
