//! Infrastructure layer: configuration, Postgres access, event publication, seeding.

pub mod config;
pub mod db;
pub mod event_bus;
pub mod mutation_dispatcher;
pub mod publisher;
pub mod repository;
pub mod seed;
