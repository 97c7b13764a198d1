pub mod auth;
pub mod review;
pub mod settings;
pub mod signatures;
pub mod student;
pub mod wizard;
