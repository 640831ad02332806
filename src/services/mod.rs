pub mod auth_service;
pub mod theme_service;
