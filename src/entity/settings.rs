//! Application settings

/// User-facing application settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Open authorization pages in custom tabs instead of an external browser
    pub use_custom_tabs: bool,
    /// Disable UDP remotes when launching a profile
    pub force_tcp: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_custom_tabs: true,
            force_tcp: false,
        }
    }
}
