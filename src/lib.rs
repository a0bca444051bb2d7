//! callscope core library: speedscope profiles to Mermaid call graphs.

mod callgraph;
mod clock;
mod cmd;
mod config;
mod escape;
mod history;
mod platform;
mod render;
mod rewrite;
mod session;
mod speedscope;
mod window;

pub use callgraph::*;
pub use clock::*;
pub use cmd::*;
pub use config::*;
pub use escape::*;
pub use history::*;
pub use platform::*;
pub use render::*;
pub use rewrite::*;
pub use session::*;
pub use speedscope::*;
pub use window::*;
