#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub mod action_pack;
pub mod active_support;
pub mod error;
pub mod util;
