//! Host platform detection

use std::fmt;

/// Platform the greeting runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Android,
    Ios,
    MacOs,
    Linux,
    Windows,
    Web,
    Unknown,
}

impl Platform {
    /// Platform of the compilation target
    pub fn current() -> Self {
        if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "ios") {
            Platform::Ios
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_family = "wasm") {
            Platform::Web
        } else {
            Platform::Unknown
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Android => "Android",
            Platform::Ios => "iOS",
            Platform::MacOs => "macOS",
            Platform::Linux => "Linux",
            Platform::Windows => "Windows",
            Platform::Web => "Web",
            Platform::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_os = "linux")]
    fn test_current_linux() {
        assert_eq!(Platform::current(), Platform::Linux);
    }

    #[test]
    fn test_display() {
        assert_eq!(Platform::Ios.to_string(), "iOS");
        assert_eq!(Platform::Android.to_string(), "Android");
    }
}
