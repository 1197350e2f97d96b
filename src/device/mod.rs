pub mod adb;
pub mod channel;
pub mod session;
pub mod settle;
