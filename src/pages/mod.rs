pub mod dataset;
pub mod home;
pub mod not_found;
