pub mod application;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod shutdown;
pub mod sponsors;
pub mod startup;
pub mod storage;
pub mod web;
