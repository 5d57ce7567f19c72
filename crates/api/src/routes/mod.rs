//! HTTP route handlers

pub mod feeds;
