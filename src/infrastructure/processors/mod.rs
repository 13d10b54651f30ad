// Processors module
pub mod asset_processor;
pub mod code_splitter;
pub mod css_processor;
pub mod js_processor;

pub use asset_processor::*;
pub use code_splitter::*;
pub use css_processor::*;
pub use js_processor::*;
