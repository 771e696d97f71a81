// This file acts as the entry point for the `backend` library.
// The binary and the integration tests both build the router from here.
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod report;
pub mod repository;
pub mod songs;
pub mod users;
pub mod web_server;
