pub mod access_log;
pub mod geojson;
pub mod role;
pub mod user;
