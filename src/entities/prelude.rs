pub use super::access_logs::Entity as AccessLogs;
pub use super::geojson_files::Entity as GeojsonFiles;
pub use super::roles::Entity as Roles;
pub use super::user_roles::Entity as UserRoles;
pub use super::users::Entity as Users;
