pub mod markdown;

pub use markdown::{Markdown, disambiguation};
