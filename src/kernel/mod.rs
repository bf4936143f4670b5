pub mod cancel;
pub mod driver;
pub mod gate;
pub mod message;
pub mod phase;
pub mod run;
pub mod segment;
pub mod telemetry;
