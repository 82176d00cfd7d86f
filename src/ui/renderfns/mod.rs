pub mod footer;
pub mod header;
pub mod pagination;
pub mod state;
pub mod utils;

pub use footer::draw_footer;
pub use header::{draw_header, extract_domain};
pub use pagination::draw_page_bar;
pub use state::{draw_error, draw_placeholder, view_block};
pub use utils::{format_date, format_duration, format_rating, rating_color, truncate};
