pub mod lines;
pub mod path;
pub mod unicode;

// Re-export the types almost every consumer needs
pub use lines::Lines;
pub use path::ModPath;
pub use unicode::{ascii_upper, Encoding};
