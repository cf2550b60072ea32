mod output;
mod status;

pub use output::draw_output;
pub use status::draw_status;
