//! Check selection and threshold presets

mod profiles;

pub use profiles::{Check, Checks, Source, Thresholds};
