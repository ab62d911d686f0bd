pub mod cache;
pub mod config;
pub mod globs;
pub mod graph;
pub mod health;
pub mod layer;
pub mod layout;
pub mod parser;
pub mod pipeline;
pub mod scanner;
pub mod types;

pub use config::ProjectConfig;
pub use graph::ModuleGraph;
pub use layer::LayerClassifier;
pub use layout::{DiagramLayout, LayoutOptions};
pub use parser::{LanguageParser, ParserRegistry};
pub use pipeline::AnalysisPipeline;
pub use types::*;
