mod create_superuser;
mod create_user;
mod init;
mod serve;

pub use create_superuser::cmd_create_superuser;
pub use create_user::cmd_create_user;
pub use init::cmd_init;
pub use serve::cmd_serve;

/// Length of passwords generated for accounts created without one.
const GENERATED_PASSWORD_LEN: usize = 20;
