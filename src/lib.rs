#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod data;
pub mod fetch;
pub mod menu;
pub mod summary;
pub mod timeline;
pub mod timestamp;
