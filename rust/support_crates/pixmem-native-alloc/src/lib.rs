//! Natively allocated, aligned memory blocks usable as buffer group segments.

pub mod align;
pub mod native_buffer;
pub mod raw;

#[cfg(test)]
mod tests;
