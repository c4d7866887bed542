pub mod apply;
pub mod destroy;
pub mod import;
pub mod mapping;
pub mod plan;
pub mod state;
pub mod usage;
