//! Version information

pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn format_version_info() -> String {
    format!("jobboard v{}", CURRENT_VERSION)
}

/// `User-Agent` sent with every request
pub fn user_agent() -> String {
    format!("jobboard-cli/{}", CURRENT_VERSION)
}
