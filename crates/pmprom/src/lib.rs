//! Top-level facade crate for pmprom.
//!
//! Re-exports the core types and the exporter library so users can depend on a single crate.

pub mod core {
    pub use pmprom_core::*;
}

pub mod exporter {
    pub use pmprom_exporter::*;
}
