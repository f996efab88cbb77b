// Library root for the ANCR congregation portal core

pub mod auth;
pub mod config;
pub mod core;
pub mod infra;
pub mod panel;
pub mod scope;
