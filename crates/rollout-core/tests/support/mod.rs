#![allow(dead_code)]

pub mod build_system;
pub mod catalog;
