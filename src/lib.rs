pub mod analysis;
pub mod coach;
pub mod commands;
pub mod config;
pub mod db;
pub mod models;
pub mod repository;
pub mod store;
pub mod sync;
