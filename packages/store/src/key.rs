use serde::{Deserialize, Serialize};
use url::Url;

/// The identity a cached response is stored under.
///
/// A request URL with its fragment removed. Fragments never reach the
/// network, so `index.html#/a` and `index.html#/b` share one entry. The
/// query string is kept: `main.js?v=1` and `main.js` are distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestKey(Url);

impl RequestKey {
    pub fn from_url(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self(url)
    }

    pub fn parse(s: &str) -> Result<Self, url::ParseError> {
        Ok(Self::from_url(&Url::parse(s)?))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&Url> for RequestKey {
    fn from(url: &Url) -> Self {
        Self::from_url(url)
    }
}

impl TryFrom<String> for RequestKey {
    type Error = url::ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<RequestKey> for String {
    fn from(key: RequestKey) -> Self {
        key.0.into()
    }
}
