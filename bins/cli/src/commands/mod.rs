//! CLI command handlers.

pub mod config;
pub mod env;
pub mod info;
pub mod render;
pub mod template;

pub use config::run_config_show;
pub use env::run_env_check;
pub use info::run_info;
pub use render::{RenderInput, run_render};
pub use template::{TemplateShowInput, run_template_show};
