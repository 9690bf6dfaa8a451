pub mod footer;
pub mod header;
pub mod utils;

pub use footer::draw_footer;
pub use header::{draw_header, extract_domain, should_show_header};
pub use utils::{status_color, truncate};
