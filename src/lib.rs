pub mod application;
pub mod config;
pub mod detect;
pub mod domain;
pub mod infra;
