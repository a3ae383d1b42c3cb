pub mod engine;
pub mod error;
pub mod record;
pub mod report;
pub mod store;

pub use engine::{DiscoveryEngine, EngineConfig, DEFAULT_API_MARKER};
pub use error::{EngineError, Result, StoreError};
pub use record::{domain_of, DiscoveryReport, DomainRecord};
pub use report::generate_domain_report;
pub use store::KnowledgeStore;

use colored::Colorize;

pub fn print_banner() {
    let banner = r#"
  _              _         _
 | | _____ _   _| |__   __| | ___
 | |/ / _ \ | | | '_ \ / _` |/ _ \
 |   <  __/ |_| | | | | (_| |  __/
 |_|\_\___|\__, |_| |_|\__,_|\___|
           |___/
"#;
    println!("{}", banner.bright_cyan());
    println!(
        "{} {}",
        "keyhole".bright_white().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
    println!("{}\n", "api discovery and auth profiling".bright_black());
}
