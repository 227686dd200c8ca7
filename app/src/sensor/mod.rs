mod generator;

pub use generator::SensorGenerator;
