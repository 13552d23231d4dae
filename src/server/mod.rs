//! JSON and static-file backend for the browser viewer.

mod http;

pub use http::ViewerServer;
