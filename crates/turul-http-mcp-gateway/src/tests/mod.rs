//! Test modules for turul-http-mcp-gateway crate
//!
//! Handler-level tests drive `GatewayHandler::handle` directly; the server
//! tests go through a real listener with `reqwest`.

mod support;

pub mod server_tests;
