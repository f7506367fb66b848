mod commit;
mod event;
mod payload;

pub use commit::*;
pub use event::*;
pub use payload::*;
