pub mod config;
pub mod conflict;
pub mod entity;
pub mod forager;
pub mod grid;
pub mod model;
pub mod patch;
pub mod sampling;
pub mod schedule;
