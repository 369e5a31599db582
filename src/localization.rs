use crate::error::{Result, SwipeboxError};
use fluent::{FluentArgs, FluentBundle, FluentResource};
use unic_langid::LanguageIdentifier;

// Generated by build.rs from locales/<lang>/main.ftl
include!(concat!(env!("OUT_DIR"), "/locales.rs"));

const DEFAULT_LOCALE: &str = "en";

pub struct Localization {
    bundle: FluentBundle<FluentResource>,
    current_locale: String,
}

impl Localization {
    /// Loads `locale`, falling back to English when it is unknown.
    pub fn new(locale: &str) -> Result<Self> {
        let locales_map = embedded_locales();
        let (resolved, resource_content) = match locales_map.get(locale) {
            Some(content) => (locale, *content),
            None => (
                DEFAULT_LOCALE,
                *locales_map
                    .get(DEFAULT_LOCALE)
                    .ok_or_else(|| SwipeboxError::Localization("default locale missing".into()))?,
            ),
        };

        let langid: LanguageIdentifier = resolved
            .parse()
            .map_err(|e| SwipeboxError::Localization(format!("bad locale {}: {:?}", resolved, e)))?;
        let mut bundle = FluentBundle::new(vec![langid]);
        // Unicode isolation marks show up as garbage in most terminals
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(resource_content.to_string())
            .map_err(|(_, errors)| SwipeboxError::Localization(format!("{:?}", errors)))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| SwipeboxError::Localization(format!("{:?}", errors)))?;

        Ok(Self {
            bundle,
            current_locale: resolved.to_string(),
        })
    }

    pub fn get(&self, key: &str) -> String {
        self.get_with_args(key, None)
    }

    /// Formats `key`; unknown keys come back verbatim.
    pub fn get_with_args(&self, key: &str, args: Option<&FluentArgs>) -> String {
        if let Some(message) = self.bundle.get_message(key)
            && let Some(pattern) = message.value()
        {
            let mut errors = vec![];
            return self
                .bundle
                .format_pattern(pattern, args, &mut errors)
                .into_owned();
        }
        key.to_string()
    }

    /// "3 of 12" style counter; `current` is zero-based.
    pub fn image_count(&self, current: usize, total: usize, separator: &str) -> String {
        let mut args = FluentArgs::new();
        args.set("current", (current + 1).to_string());
        args.set("separator", separator.to_string());
        args.set("total", total.to_string());
        self.get_with_args("image_count", Some(&args))
    }

    pub fn with_name(&self, key: &str, name: &str) -> String {
        let mut args = FluentArgs::new();
        args.set("name", name.to_string());
        self.get_with_args(key, Some(&args))
    }

    pub fn current_locale(&self) -> &str {
        &self.current_locale
    }
}
