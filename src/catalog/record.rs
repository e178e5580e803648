use serde::ser::{Serialize, SerializeMap, Serializer};

/// Fixed schema every ingested row is normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Id,
    Title,
    Category,
    ImageRefs,
    BulletText,
    SearchRankMin,
    SearchRankAvg,
    CategoryRankMin,
    CategoryRankAvg,
    CategoryNode,
    BrandName,
    DescriptionText,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 12] = [
        Self::Id,
        Self::Title,
        Self::Category,
        Self::ImageRefs,
        Self::BulletText,
        Self::SearchRankMin,
        Self::SearchRankAvg,
        Self::CategoryRankMin,
        Self::CategoryRankAvg,
        Self::CategoryNode,
        Self::BrandName,
        Self::DescriptionText,
    ];

    /// Serialized key. Every key is recognized again by the header normalizer,
    /// so exported rows re-ingest into the same fields.
    pub fn key(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Category => "category",
            Self::ImageRefs => "image_url",
            Self::BulletText => "bullets",
            Self::SearchRankMin => "min_rank_search",
            Self::SearchRankAvg => "avg_rank_search",
            Self::CategoryRankMin => "min_rank_category",
            Self::CategoryRankAvg => "avg_rank_category",
            Self::CategoryNode => "category_node",
            Self::BrandName => "brand_name",
            Self::DescriptionText => "description",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalRecord {
    pub id: String,
    pub title: String,
    pub category: String,
    pub image_refs: String,
    pub bullet_text: String,
    pub search_rank_min: String,
    pub search_rank_avg: String,
    pub category_rank_min: String,
    pub category_rank_avg: String,
    pub category_node: String,
    pub brand_name: String,
    pub description_text: String,
    /// Columns no header rule recognized, keyed by slug, in source column order.
    pub extras: Vec<(String, String)>,
}

impl CanonicalRecord {
    pub fn get(&self, field: CanonicalField) -> &str {
        match field {
            CanonicalField::Id => &self.id,
            CanonicalField::Title => &self.title,
            CanonicalField::Category => &self.category,
            CanonicalField::ImageRefs => &self.image_refs,
            CanonicalField::BulletText => &self.bullet_text,
            CanonicalField::SearchRankMin => &self.search_rank_min,
            CanonicalField::SearchRankAvg => &self.search_rank_avg,
            CanonicalField::CategoryRankMin => &self.category_rank_min,
            CanonicalField::CategoryRankAvg => &self.category_rank_avg,
            CanonicalField::CategoryNode => &self.category_node,
            CanonicalField::BrandName => &self.brand_name,
            CanonicalField::DescriptionText => &self.description_text,
        }
    }

    pub fn field_mut(&mut self, field: CanonicalField) -> &mut String {
        match field {
            CanonicalField::Id => &mut self.id,
            CanonicalField::Title => &mut self.title,
            CanonicalField::Category => &mut self.category,
            CanonicalField::ImageRefs => &mut self.image_refs,
            CanonicalField::BulletText => &mut self.bullet_text,
            CanonicalField::SearchRankMin => &mut self.search_rank_min,
            CanonicalField::SearchRankAvg => &mut self.search_rank_avg,
            CanonicalField::CategoryRankMin => &mut self.category_rank_min,
            CanonicalField::CategoryRankAvg => &mut self.category_rank_avg,
            CanonicalField::CategoryNode => &mut self.category_node,
            CanonicalField::BrandName => &mut self.brand_name,
            CanonicalField::DescriptionText => &mut self.description_text,
        }
    }

    /// Writes a value by serialized key. Canonical keys land in their field;
    /// anything else is kept as a pass-through column at its first position.
    pub fn set(&mut self, key: &str, value: String) {
        if let Some(field) = CanonicalField::from_key(key) {
            *self.field_mut(field) = value;
            return;
        }

        match self.extras.iter_mut().find(|(existing, _)| existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.extras.push((key.to_string(), value)),
        }
    }

    /// Canonical fields in schema order, then pass-through columns.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        CanonicalField::ALL
            .into_iter()
            .map(|field| (field.key(), self.get(field)))
            .chain(
                self.extras
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            )
    }

    /// Decodes `image_url`, which sources store either as one URL or as a
    /// JSON-ish list such as `['https://a', 'https://b']`.
    pub fn image_urls(&self) -> Vec<String> {
        let raw = self.image_refs.trim();
        if raw.is_empty() {
            return Vec::new();
        }

        match serde_json::from_str::<Vec<String>>(&raw.replace('\'', "\"")) {
            Ok(urls) => urls,
            Err(_) => vec![raw.to_string()],
        }
    }
}

impl Serialize for CanonicalRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(CanonicalField::ALL.len() + self.extras.len()))?;
        for (key, value) in self.entries() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
