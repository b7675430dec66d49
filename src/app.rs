//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model in `app::model` owns the library index and everything
//! else the presentation context renders.

mod model;

pub use model::*;
