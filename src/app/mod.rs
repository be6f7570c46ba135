// Application-layer ports; adapters live in crate::infra
pub mod ports;
