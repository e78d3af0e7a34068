// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    generate_scan_id, load_urls_from_file, load_urls_from_source, parse_url_line, run_scan,
    scan_config_from_matches,
};
