pub mod common;
pub mod get;
pub mod info;
pub mod list;
pub mod metadata;
pub mod quality;
