//! IndyStats (indycar.com) results API.

mod client;

pub use client::IndyCarClient;
