pub mod init;
pub mod status;

pub use init::run_init;
pub use status::run_status;
