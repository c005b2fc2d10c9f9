//! Handlers for server-to-server commands.

mod away;
mod nick;
mod quit;
mod sjoin;
mod source;
mod uid;

pub use away::AwayHandler;
pub use nick::NickHandler;
pub use quit::QuitHandler;
pub use sjoin::{SjoinHandler, parse_sjoin};
pub use uid::UidHandler;
