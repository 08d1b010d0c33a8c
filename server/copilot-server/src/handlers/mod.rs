pub mod auth;
pub mod consultations;
pub mod health;
pub mod patients;
