mod csv;
pub mod recorder;
pub mod trend;
