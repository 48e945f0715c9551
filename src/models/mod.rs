pub mod change;
pub mod error;
pub mod health;
pub mod list;
pub mod notification;

pub use change::*;
pub use error::*;
pub use health::*;
pub use list::*;
pub use notification::*;
