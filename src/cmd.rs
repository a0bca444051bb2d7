mod archive_cmd;
mod render_cmd;
mod rewrite_cmd;
mod schema;

pub use archive_cmd::*;
pub use render_cmd::*;
pub use rewrite_cmd::*;
pub use schema::*;
