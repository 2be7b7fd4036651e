use scraper::{ElementRef, Html};

/// Tags whose references are followed when mirroring.
const LINK_TAGS: [&str; 4] = ["a", "link", "img", "script"];

/// Attributes carrying a reference on those tags.
const LINK_ATTRS: [&str; 2] = ["href", "src"];

const IGNORED_SCHEMES: [&str; 4] = ["mailto:", "tel:", "javascript:", "data:"];

/// Collect raw `href`/`src` values from `a`, `link`, `img` and `script`
/// elements, in document order. References that can never name a
/// fetchable resource are dropped.
pub fn extract_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| LINK_TAGS.contains(&element.value().name()))
        .flat_map(|element| {
            LINK_ATTRS
                .iter()
                .filter_map(move |attr| element.value().attr(attr))
                .map(|value| value.trim().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|reference| is_followable(reference))
        .collect()
}

fn is_followable(reference: &str) -> bool {
    if reference.is_empty() || reference.starts_with('#') {
        return false;
    }
    let lower = reference.to_ascii_lowercase();
    !IGNORED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}
