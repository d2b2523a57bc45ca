// Infrastructure layer - External dependencies and adapters
pub mod chunked_json;
pub mod config;
pub mod http_response;
pub mod page_transport;
pub mod sensorthings_repository;
pub mod street_loader;
