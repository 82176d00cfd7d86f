mod command_input;
mod flash;
mod input;
mod key_result;
mod search_input;

pub use command_input::{CommandEvent, CommandInput};
pub use flash::{expire, Flash};
pub use key_result::KeyResult;
pub use search_input::{SearchEvent, SearchInput};
