//! Slack Block Kit presentation for watch finder responses.
//!
//! - **Block Kit** (`blocks`) - typed message builders (sections, images, buttons)
//! - **Render** (`render`) - maps channel-neutral `ResponseDirective`s to Block Kit messages
//!
//! ```text
//! DialogEngine → ResponseDirective → render → MessageTemplate → channel
//! ```

pub mod blocks;
pub mod render;

pub use blocks::{error_message, Block, MessageBuilder, MessageTemplate};
pub use render::{render_directive, render_directives};
