pub mod clock;
pub mod selector;
