pub mod dir;
pub mod fsm;
pub mod init;
pub mod status;
