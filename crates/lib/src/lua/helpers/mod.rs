//! Helper tables exposed to scripts under `cake`.

pub mod path;
