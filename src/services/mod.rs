// Services module - resolution and ranking logic

pub mod identity;
pub mod matcher;
pub mod ranking;
pub mod sources;

// External endpoints
pub mod providers;
