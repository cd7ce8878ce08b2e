//! Filesystem utilities.
//!
//! Every file mutation made by the patch engine goes through [`atomic_write`].

pub mod atomic;

pub use atomic::{atomic_write, atomic_write_file, remove_file_if_exists};
