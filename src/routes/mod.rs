pub mod access;
pub mod calls;
pub mod general;
pub mod voice;
