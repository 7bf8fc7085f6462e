pub mod game;
pub mod save;
pub mod user;
pub mod vote;

pub use game::*;
pub use save::*;
pub use user::*;
pub use vote::*;
