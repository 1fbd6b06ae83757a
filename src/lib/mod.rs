#[macro_use]
extern crate lazy_static;
extern crate tracing;

pub mod cli;
pub mod compose;
pub mod display;
pub mod lifecycle;
pub mod logger;
pub mod sensor;
