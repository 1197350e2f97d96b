pub mod apps;
pub mod controller;
pub mod request;
pub mod response;
