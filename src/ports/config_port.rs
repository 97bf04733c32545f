//! Configuration access port trait.

/// Typed access to sectioned configuration. Getters other than
/// [`ConfigPort::get_string`] fall back to the supplied default when the key
/// is absent or unparsable.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}
