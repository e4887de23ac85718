// Shared test support code for readiness tests.
// Provides local TCP/HTTP fixtures and fast probe settings.

pub mod common;
pub mod http_server;
pub mod listener;

pub use common::*;
pub use http_server::HttpServer;
pub use listener::{
    unused_port, ClosingServer, ReplyingServer, SilentServer, REPLY_CONNECTION_CLOSE, REPLY_HTTP10,
};
