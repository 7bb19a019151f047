pub(crate) mod auth;
mod chat;
pub mod client;
mod files;
pub mod types;

pub use client::*;
pub use types::*;

#[cfg(test)]
mod tests;
