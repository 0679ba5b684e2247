pub mod access_logger;
pub use access_logger::{AccessLogger, RequestMeta};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, RegisterInput};
pub use auth_service_impl::SeaOrmAuthService;

pub mod sig_service;
pub mod sig_service_impl;
pub use sig_service::{LoadExamplesOutcome, SigError, SigService, UploadInput};
pub use sig_service_impl::SeaOrmSigService;

pub mod admin_service;
pub mod admin_service_impl;
pub use admin_service::{
    AccessLogPage, AdminCounts, AdminError, AdminService, NewUserInput, UserUpdateInput, UserView,
};
pub use admin_service_impl::SeaOrmAdminService;
