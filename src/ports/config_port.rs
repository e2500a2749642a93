//! Configuration access port trait.

/// Raw string lookups by `[section] key`. Typing and validation happen in
/// `domain::config_validation`.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
