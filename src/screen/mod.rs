pub mod hit_test;
pub mod lock;
pub mod query;
pub mod registry;
pub mod screen_model;
pub mod snapshot;
