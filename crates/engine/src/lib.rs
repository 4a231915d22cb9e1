pub mod api;
pub mod app;
pub mod infrastructure;
pub mod use_cases;
