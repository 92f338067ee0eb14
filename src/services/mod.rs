pub mod broadcast_service;
pub mod ingest_service;
