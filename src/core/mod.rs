pub mod analyzer;
pub mod cancel;
pub mod enumerator;
pub mod events;
pub mod progress;
pub mod scanner;
pub mod sizer;
mod walk;
