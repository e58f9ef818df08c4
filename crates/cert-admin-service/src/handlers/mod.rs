//! REST API 处理器

pub mod certificates;
pub mod diagnostics;
pub mod session;
pub mod status;
