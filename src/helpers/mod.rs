//! Helper functions shared by the generator, templates and server
//!
//! Date formatting, HTML escaping and URL building.

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
