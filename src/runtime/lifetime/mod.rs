pub mod hooks;
pub mod shutdown;
