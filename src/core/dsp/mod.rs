//! Digital Signal Processing utilities

pub mod fft;
pub mod filters;
pub mod stats;
pub mod windows;

pub use fft::FftProcessor;
pub use filters::{Biquad, KWeighting};
pub use stats::{amplitude_to_db, db_to_amplitude, MIN_DB};
pub use windows::{create_window, WindowType};
