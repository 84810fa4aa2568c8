#![warn(rust_2018_idioms)]

pub mod error;
pub mod time;
