use url::Url;

/// File suffixes that must not be downloaded (`-R jpg,gif`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectList {
    suffixes: Vec<String>,
}

impl RejectList {
    /// Parse a comma-separated list. Leading dots and case are ignored.
    pub fn parse(list: &str) -> Self {
        Self::from_suffixes(list.split(','))
    }

    pub fn from_suffixes<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = suffixes
            .into_iter()
            .map(|s| s.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { suffixes }
    }

    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }

    pub fn matches(&self, url: &Url) -> bool {
        if self.suffixes.is_empty() {
            return false;
        }
        let path = url.path().to_ascii_lowercase();
        self.suffixes
            .iter()
            .any(|suffix| path.ends_with(&format!(".{}", suffix)))
    }
}
