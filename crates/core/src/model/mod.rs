pub mod attr;
pub mod log;
pub mod order;
pub mod resource;
pub mod span;
