use url::Url;

use crate::recipe::RecipeId;

/// Convenience wrapper for URL generation functions.
#[derive(Clone)]
pub struct Urls {
    /// Top-level URL, including trailing slash.
    base: Url,
}

impl Urls {
    pub fn new(base: Url) -> Self {
        Urls { base }
    }

    /// Parses `base`, adding the trailing slash if it is missing so
    /// that relative joins keep any path prefix.
    pub fn parse(base: impl AsRef<str>) -> Result<Self, url::ParseError> {
        let base = base.as_ref();

        if base.ends_with('/') {
            Url::parse(base).map(Urls::new)
        } else {
            Url::parse(&format!("{}/", base)).map(Urls::new)
        }
    }

    pub fn recipe(&self, id: &RecipeId) -> Result<Url, url::ParseError> {
        self.base.join(&format!("recipe/{}", id))
    }
}
