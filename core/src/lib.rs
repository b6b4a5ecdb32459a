pub mod adjuster;
pub mod assembler;
pub mod attributes;
pub mod calendar;
pub mod config;
pub mod customer;
pub mod engine;
pub mod error;
pub mod location;
pub mod rating;
pub mod record;
pub mod rng;
pub mod sales;
pub mod sampler;
pub mod stage;
pub mod temporal;
pub mod types;
