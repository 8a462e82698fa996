//! Alert message templates.
//!
//! This module provides:
//! - A fixed set of templates compiled into the binary (`templates/`)
//! - A small text engine with `{{path}}` placeholders, helper pipelines and
//!   `{{#if}}` blocks
//! - Front-matter extraction: the rendered text starts with a YAML header
//!   fenced by `---` lines, holding at least the mail `subject`
//!
//! # Example
//!
//! ```ignore
//! let store = TemplateStore::bundled()?;
//!
//! let context = json!({
//!     "event": { "DTSTART": "20240115T093000Z", "LOCATION": "Amphi A" },
//!     "isNew": true
//! });
//!
//! let rendered = store.render("alert.txt", &context)?;
//! println!("{}\n\n{}", rendered.header.subject, rendered.body);
//! ```
//!
//! # Syntax
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `{{ event.LOCATION }}` | value at a dotted path in the context |
//! | `{{ event.DTSTART \| format_date }}` | value piped through helpers |
//! | `{{ event.DTSTART \| format_date \| yaml_string }}` | helpers applied left to right |
//! | `{{#if isNew}}…{{else}}…{{/if}}` | conditional block, nestable |

mod engine;
mod front_matter;
mod helpers;
mod store;

use thiserror::Error;

pub use engine::CompiledTemplate;
pub use front_matter::{split_front_matter, MailHeader};
pub use helpers::{clean_description, format_date, yaml_string};
pub use store::TemplateStore;

/// Template-specific error type
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template syntax error: {0}")]
    Syntax(String),

    #[error("Template execution failed: {0}")]
    Execution(String),

    #[error("Invalid front matter: {0}")]
    FrontMatter(String),
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, RenderError>;

/// Output of a template: parsed header and the body that follows it
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    pub header: MailHeader,
    pub body: String,
}

impl RenderedMessage {
    pub fn subject(&self) -> &str {
        &self.header.subject
    }
}
