//! Built-in scheduler backends.

mod heap;
mod list;
mod map;

pub use heap::HeapScheduler;
pub use list::ListScheduler;
pub use map::MapScheduler;
