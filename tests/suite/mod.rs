//! Integration test suite modules

mod runner;
mod tool;
