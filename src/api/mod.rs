pub mod error;
pub mod form;
pub mod health;
pub mod openapi;
pub mod predict;
