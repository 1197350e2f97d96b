pub mod detector;
pub mod omniparser;
