use std::sync::LazyLock;

use regex::Regex;

use super::record::CanonicalField;

static MATCH_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\s._"']+"#).expect("valid header noise regex"));
static SLUG_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s.]+").expect("valid slug separator regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderTarget {
    Canonical(CanonicalField),
    PassThrough(String),
}

impl HeaderTarget {
    pub fn key(&self) -> &str {
        match self {
            Self::Canonical(field) => field.key(),
            Self::PassThrough(slug) => slug,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Pattern {
    Equals(&'static str),
    Contains(&'static str),
}

impl Pattern {
    fn matches(self, key: &str) -> bool {
        match self {
            Self::Equals(expected) => key == expected,
            Self::Contains(fragment) => key.contains(fragment),
        }
    }
}

/// Ordered recognition rules; the first match wins.
const HEADER_RULES: &[(Pattern, CanonicalField)] = {
    use CanonicalField::*;
    use Pattern::*;
    &[
        (Contains("skuid"), Id),
        (Contains("productid"), Id),
        (Equals("id"), Id),
        (Equals("asin"), Id),
        (Equals("name"), Title),
        (Equals("productname"), Title),
        (Equals("title"), Title),
        (Equals("category"), Category),
        (Equals("universe"), Category),
        (Equals("images"), ImageRefs),
        (Equals("image"), ImageRefs),
        (Equals("imageurl"), ImageRefs),
        (Equals("positioning"), BulletText),
        (Equals("bullets"), BulletText),
        (Equals("bulletpoints"), BulletText),
        (Equals("features"), BulletText),
        (Equals("description"), DescriptionText),
        (Equals("productdescription"), DescriptionText),
        (Equals("desc"), DescriptionText),
        (Equals("descriptionfilled"), DescriptionText),
        (Contains("minranksearch"), SearchRankMin),
        (Contains("avgranksearch"), SearchRankAvg),
        (Contains("minrankcategory"), CategoryRankMin),
        (Contains("avgrankcategory"), CategoryRankAvg),
        (Contains("categorynode"), CategoryNode),
        (Contains("brandname"), BrandName),
        (Equals("brand"), BrandName),
    ]
};

pub fn normalize_header(label: &str) -> HeaderTarget {
    let key = match_key(label);

    HEADER_RULES
        .iter()
        .find(|(pattern, _)| pattern.matches(&key))
        .map(|(_, field)| HeaderTarget::Canonical(*field))
        .unwrap_or_else(|| HeaderTarget::PassThrough(slugify(label)))
}

fn match_key(label: &str) -> String {
    MATCH_NOISE
        .replace_all(&label.to_lowercase(), "")
        .into_owned()
}

pub fn slugify(label: &str) -> String {
    let lowered = label.to_lowercase().replace(['"', '\''], "");
    SLUG_SEPARATOR
        .replace_all(lowered.trim(), "_")
        .into_owned()
}
