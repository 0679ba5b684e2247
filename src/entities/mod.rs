pub mod prelude;

pub mod access_logs;
pub mod geojson_files;
pub mod roles;
pub mod user_roles;
pub mod users;
