pub mod aggregate;
pub mod db;
pub mod error;
pub mod models;
pub mod planner;
pub mod random;
pub mod recipes;
pub mod service;
pub mod store;
