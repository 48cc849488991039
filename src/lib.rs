pub mod config;
pub mod create;
pub mod delay;
pub mod messages;
pub mod range;
pub mod routines;
pub mod runtime;
pub mod snapper;
