//! Cloak Configuration
//!
//! Built-in defaults, caller-supplied partial overrides, and the live
//! configuration handle shared by every pipeline stage.

use std::sync::{Arc, PoisonError, RwLock};

use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// Default disguise title
pub const DEFAULT_TITLE: &str = "Google Classroom";

/// Default disguise favicon
pub const DEFAULT_FAVICON: &str = "https://ssl.gstatic.com/classroom/favicon.png";

/// Default exit-confirmation message
pub const DEFAULT_CONFIRMATION_MESSAGE: &str = "Are you sure you want to leave this page?";

/// Default redirect candidates
pub const DEFAULT_REDIRECT_URLS: &[&str] = &[
    "https://classroom.google.com",
    "https://docs.google.com",
    "https://drive.google.com",
    "https://www.google.com",
];

/// A named disguise from the built-in catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisguisePreset {
    pub name: &'static str,
    pub title: &'static str,
    pub favicon: &'static str,
}

/// Built-in disguise catalogue
pub const DISGUISE_PRESETS: &[DisguisePreset] = &[
    DisguisePreset {
        name: "classroom",
        title: DEFAULT_TITLE,
        favicon: DEFAULT_FAVICON,
    },
    DisguisePreset {
        name: "docs",
        title: "Google Docs",
        favicon: "https://ssl.gstatic.com/docs/documents/images/kix-favicon7.ico",
    },
    DisguisePreset {
        name: "drive",
        title: "My Drive - Google Drive",
        favicon: "https://ssl.gstatic.com/images/branding/product/1x/drive_2020q4_32dp.png",
    },
    DisguisePreset {
        name: "canvas",
        title: "Dashboard",
        favicon: "https://canvas.instructure.com/favicon.ico",
    },
    DisguisePreset {
        name: "khan",
        title: "Khan Academy",
        favicon: "https://www.khanacademy.org/favicon.ico",
    },
];

/// What the popup pretends to be
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disguise {
    /// Document title of the popup
    pub title: String,
    /// Favicon URL (None or empty = no favicon link)
    pub favicon: Option<String>,
}

impl Default for Disguise {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            favicon: Some(DEFAULT_FAVICON.to_string()),
        }
    }
}

impl Disguise {
    /// The favicon to inject, skipping empty values
    pub fn favicon_href(&self) -> Option<&str> {
        self.favicon.as_deref().filter(|href| !href.is_empty())
    }

    /// All built-in presets
    pub fn presets() -> &'static [DisguisePreset] {
        DISGUISE_PRESETS
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        DISGUISE_PRESETS
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(Self::from)
    }

    /// Pick a random preset
    pub fn random_preset() -> Self {
        DISGUISE_PRESETS
            .choose(&mut rand::thread_rng())
            .map(Self::from)
            .unwrap_or_default()
    }
}

impl From<&DisguisePreset> for Disguise {
    fn from(preset: &DisguisePreset) -> Self {
        Self {
            title: preset.title.to_string(),
            favicon: Some(preset.favicon.to_string()),
        }
    }
}

/// Origin-tab disposal settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    /// Close / navigate away the original tab after the popup is built
    pub enabled: bool,
    /// Candidates for `random_redirect_url`
    pub urls: Vec<String>,
}

impl Default for Redirect {
    fn default() -> Self {
        Self {
            enabled: true,
            urls: DEFAULT_REDIRECT_URLS.iter().map(|u| u.to_string()).collect(),
        }
    }
}

/// Popup exit-confirmation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Protection {
    /// Install a beforeunload trap in the popup
    pub exit_confirmation: bool,
    /// Message returned by the trap
    pub confirmation_message: String,
}

impl Default for Protection {
    fn default() -> Self {
        Self {
            exit_confirmation: true,
            confirmation_message: DEFAULT_CONFIRMATION_MESSAGE.to_string(),
        }
    }
}

/// Fully-populated cloak configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloakConfig {
    /// Master switch
    pub enabled: bool,
    /// Skip agents with restrictive popup semantics (Firefox)
    pub skip_firefox: bool,
    /// Skip when running inside a frame
    pub skip_iframes: bool,
    pub disguise: Disguise,
    pub redirect: Redirect,
    pub protection: Protection,
}

impl Default for CloakConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            skip_firefox: true,
            skip_iframes: true,
            disguise: Disguise::default(),
            redirect: Redirect::default(),
            protection: Protection::default(),
        }
    }
}

impl CloakConfig {
    /// Merge optional caller overrides over the defaults
    pub fn resolve(partial: Option<&PartialConfig>) -> Self {
        let mut config = Self::default();
        if let Some(partial) = partial {
            config.merge(partial);
        }
        config
    }

    /// Apply overrides in place. Top-level leaves overwrite; each group is
    /// merged leaf by leaf so unspecified leaves keep their current value.
    pub fn merge(&mut self, partial: &PartialConfig) {
        if let Some(enabled) = partial.enabled {
            self.enabled = enabled;
        }
        if let Some(skip) = partial.skip_firefox {
            self.skip_firefox = skip;
        }
        if let Some(skip) = partial.skip_iframes {
            self.skip_iframes = skip;
        }

        if let Some(disguise) = &partial.disguise {
            if let Some(title) = &disguise.title {
                self.disguise.title = title.clone();
            }
            if let Some(favicon) = &disguise.favicon {
                self.disguise.favicon = favicon.clone();
            }
        }

        if let Some(redirect) = &partial.redirect {
            if let Some(enabled) = redirect.enabled {
                self.redirect.enabled = enabled;
            }
            if let Some(urls) = &redirect.urls {
                self.redirect.urls = urls.clone();
            }
        }

        if let Some(protection) = &partial.protection {
            if let Some(exit) = protection.exit_confirmation {
                self.protection.exit_confirmation = exit;
            }
            if let Some(message) = &protection.confirmation_message {
                self.protection.confirmation_message = message.clone();
            }
        }
    }

    /// Random pick from `redirect.urls` (None if the list is empty)
    pub fn random_redirect_url(&self) -> Option<&str> {
        self.redirect
            .urls
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }
}

/// Keeps an explicit `null` apart from a missing key: absent is `None`,
/// `null` is `Some(None)`
fn explicit_null<'de, D, T>(
    deserializer: D,
) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialDisguise {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// `Some(None)` clears the favicon
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub favicon: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialRedirect {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialProtection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_confirmation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_message: Option<String>,
}

/// Caller-supplied overrides. Every leaf is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_firefox: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_iframes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disguise: Option<PartialDisguise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<PartialRedirect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection: Option<PartialProtection>,
}

impl PartialConfig {
    /// Parse overrides from a JSON object
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.disguise.get_or_insert_with(Default::default).title = Some(title.into());
        self
    }

    pub fn with_favicon(mut self, favicon: impl Into<String>) -> Self {
        self.disguise.get_or_insert_with(Default::default).favicon = Some(Some(favicon.into()));
        self
    }

    /// Drop the favicon link entirely
    pub fn without_favicon(mut self) -> Self {
        self.disguise.get_or_insert_with(Default::default).favicon = Some(None);
        self
    }

    pub fn with_redirect_enabled(mut self, enabled: bool) -> Self {
        self.redirect.get_or_insert_with(Default::default).enabled = Some(enabled);
        self
    }

    pub fn with_exit_confirmation(mut self, enabled: bool) -> Self {
        self.protection
            .get_or_insert_with(Default::default)
            .exit_confirmation = Some(enabled);
        self
    }
}

/// The live configuration, shared by reference between the control surface
/// and every pipeline stage. Stages read it at call time and never keep a copy.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<CloakConfig>>,
}

impl SharedConfig {
    pub fn new(config: CloakConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Clone of the current value
    pub fn snapshot(&self) -> CloakConfig {
        self.read(CloakConfig::clone)
    }

    /// Read the current value
    pub fn read<R>(&self, f: impl FnOnce(&CloakConfig) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Mutate the current value
    pub fn update<R>(&self, f: impl FnOnce(&mut CloakConfig) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Merge overrides into the live value
    pub fn merge(&self, partial: &PartialConfig) {
        self.update(|config| config.merge(partial));
    }
}
