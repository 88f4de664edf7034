//! Element-specific behavior: media presentation, `set` animation and the
//! layout model

pub mod animation;
pub mod layout;
pub mod media;
