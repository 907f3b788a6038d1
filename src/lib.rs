pub mod console;
pub mod debugger;
pub mod log;
