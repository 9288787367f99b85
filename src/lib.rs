pub mod collection;
pub mod columns;
pub mod config;
pub mod error;
pub mod format;
pub mod menu;
pub mod mutate;
pub mod registry;
pub mod resolve;
pub mod session;
pub mod sort;
pub mod cli;

pub use error::{AppError, AppResult};
pub use session::{BrowserSession, BrowserState};

// Test-only printing helper: expands to eprintln! during tests and debug builds and is absent otherwise.
// Usage: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In non-test builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
