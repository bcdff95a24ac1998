pub mod round;

pub use round::RoundTracker;
