// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::resolve_cache_dir;

// Re-export the core surface for embedders
pub use keyhole_core::{
    generate_domain_report, DiscoveryEngine, DiscoveryReport, EngineConfig, KnowledgeStore,
};
