//! Configuration access port trait.
//!
//! Values are handed out as raw strings; typed parsing and range checks
//! live in `domain::config_validation` so every adapter reports bad values
//! the same way.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Keys present in `section`, sorted. Empty when the section is absent.
    fn keys(&self, section: &str) -> Vec<String>;

    fn has_section(&self, section: &str) -> bool;
}
