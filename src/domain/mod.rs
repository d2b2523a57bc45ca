// Domain layer - Pure join, geometry and classification logic
pub mod aggregation;
pub mod classification;
pub mod error;
pub mod geometry;
pub mod joined_sample;
pub mod observation;
pub mod render;
pub mod street;
pub mod time_index;
pub mod time_window;
