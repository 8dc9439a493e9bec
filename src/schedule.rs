pub mod clock;
pub mod policy;
pub mod scheduler;
pub mod slot;
