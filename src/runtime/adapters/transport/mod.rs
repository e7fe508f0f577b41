//! HTTP and WebSocket transports.

mod http;
mod ws;

pub use http::{HttpInbound, HttpOutbound};
pub use ws::{WsInbound, WsOutbound};
