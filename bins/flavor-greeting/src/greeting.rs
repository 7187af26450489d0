//! The greeting shown at startup
//!
//! [`Greeting`] receives the flavor settings from its caller instead of
//! reading a global, so tests can hand it any flavor.

use crate::flavor::FlavorSettings;
use crate::platform::Platform;

/// Extra setting holding the greeting word
pub const GREETING_KEY: &str = "greeting";

#[derive(Debug, thiserror::Error)]
pub enum GreetingError {
    #[error("Missing setting '{key}' in flavor '{flavor}'")]
    MissingSetting { key: &'static str, flavor: &'static str },
}

/// Greets the user with the active flavor's wording
#[derive(Debug, Clone, Copy)]
pub struct Greeting {
    word: &'static str,
    display_name: &'static str,
    platform: Platform,
}

impl Greeting {
    pub fn new(settings: &FlavorSettings, platform: Platform) -> Result<Self, GreetingError> {
        let word = settings
            .get(GREETING_KEY)
            .ok_or(GreetingError::MissingSetting {
                key: GREETING_KEY,
                flavor: settings.name,
            })?;

        Ok(Self {
            word,
            display_name: settings.display_name,
            platform,
        })
    }

    pub fn greet(&self) -> String {
        format!("{}, {}! ({})", self.word, self.platform, self.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flavor::FlavorBackend;

    const DEVELOPMENT: FlavorSettings = FlavorSettings {
        name: "development",
        display_name: "App Dev",
        identifier_suffix: ".dev",
        backend: None,
        extra: &[("greeting", "Hi")],
    };

    const PRODUCTION: FlavorSettings = FlavorSettings {
        name: "production",
        display_name: "App",
        identifier_suffix: "",
        backend: Some(FlavorBackend {
            project_id: "app-prod",
            api_base_url: "https://app-prod.example.com",
            storage_bucket: None,
        }),
        extra: &[("greeting", "Hello")],
    };

    #[test]
    fn test_greet_development() {
        let greeting = Greeting::new(&DEVELOPMENT, Platform::Ios).unwrap();
        assert_eq!(greeting.greet(), "Hi, iOS! (App Dev)");
    }

    #[test]
    fn test_greet_production() {
        let greeting = Greeting::new(&PRODUCTION, Platform::Android).unwrap();
        assert_eq!(greeting.greet(), "Hello, Android! (App)");
    }

    #[test]
    fn test_missing_greeting() {
        let bare = FlavorSettings {
            extra: &[],
            ..DEVELOPMENT
        };
        let err = Greeting::new(&bare, Platform::Linux).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing setting 'greeting' in flavor 'development'"
        );
    }

    #[test]
    fn test_built_flavor_has_greeting() {
        assert!(Greeting::new(&crate::flavor::SETTINGS, Platform::current()).is_ok());
    }
}
