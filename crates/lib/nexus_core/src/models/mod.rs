//! Domain models shared by the client and the CLI.

pub mod auth;
pub mod health;
