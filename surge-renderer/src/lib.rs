//! # surge-renderer
//!
//! Turns merged canonical entries into the exact bytes written to disk.
//! Text outputs go through tera templates; images pass through unchanged.
//! Rendered text carries no timestamps, so identical input renders
//! byte-identical output.
//!
//! ```rust,no_run
//! use std::path::Path;
//! use surge_core::SourceFormat;
//! use surge_renderer::TemplateEngine;
//!
//! fn render(entries: &[surge_normalize::CanonicalEntry]) {
//!     if let Ok(engine) = TemplateEngine::for_root(Path::new(".")) {
//!         let bytes = engine.render_entries(
//!             SourceFormat::RuleList,
//!             Path::new("social/telegram.conf"),
//!             entries,
//!             vec![],
//!             None,
//!         );
//!         println!("{:?}", bytes.map(|b| b.len()));
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod icon_index;

pub use context::ResourceContext;
pub use engine::{user_template_dir_at, OutputKind, TemplateEngine, TEMPLATE_DIR};
pub use error::RenderError;
pub use icon_index::{IconIndex, IconRef};
