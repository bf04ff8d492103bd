//! User registration, email confirmation and login over DynamoDB, plus an interactive
//! table administration tool.

pub mod accounts;
pub mod admin;
pub mod app;
pub mod config;
pub mod dynamo;
pub mod state;
pub mod telemetry;
