pub mod live_routes;
pub mod reading_routes;
pub mod state_routes;
pub mod system_routes;
