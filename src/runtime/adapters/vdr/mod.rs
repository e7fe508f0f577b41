//! DID resolver adapters.

mod http_binding;

pub use http_binding::HttpBindingResolver;
