pub mod data_source;
pub mod location;
pub mod schema;
pub mod weather_frame;
