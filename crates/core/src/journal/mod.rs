//! Journal domain-write ports and service.

pub mod ports;
pub mod service;
