//! FreeIPA directory backend
//!
//! Talks to the server's JSON-RPC endpoint (`/ipa/session/json`) after a
//! password login. Batched directory operations go out as a single `batch`
//! command.

mod client;
pub mod rpc;

pub use client::IpaClient;
