//! Critter bot - configuration, command handling, and the console front end.

pub mod commands;
pub mod config;
pub mod cowsay;
pub mod error;
