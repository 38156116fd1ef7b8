//! FFI bindings crate for the Korb Flutter app.

pub mod api;
