// Application layer - Use cases over the domain
pub mod observation_repository;
pub mod ride_map_service;
pub mod street_network_store;
