pub mod actor;
pub mod allocator;
pub mod api;
pub mod awards;
pub mod collection;
pub mod persistence;
pub mod roster;
pub mod source;
