pub mod aggregate;
pub mod engine;
pub mod models;
pub mod rules;
pub mod types;
pub mod velocity;
