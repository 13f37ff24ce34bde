pub mod admin_auth_service;
pub mod bib_allocator;
pub mod export_service;
pub mod ranking_service;
pub mod registration_service;
