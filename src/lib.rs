pub mod animation;
pub mod app;
pub mod config;
pub mod error;
pub mod gallery;
pub mod gesture;
pub mod image_loader;
pub mod input;
pub mod localization;
pub mod navigation;
pub mod preload;
pub mod ui;

#[cfg(test)]
mod test_utils;
