pub mod init;
pub mod plan;
pub mod up;
pub mod validate;
