//! Post models, reprojected from CMS documents

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer};

use crate::cms::{ContentError, Document, RichTextBlock};
use crate::helpers::parse_timestamp;

/// A post as shown on the listing page
#[derive(Debug, Clone, PartialEq)]
pub struct PostSummary {
    /// Slug, unique within the listing
    pub uid: String,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// A fully resolved post
#[derive(Debug, Clone, PartialEq)]
pub struct PostDetail {
    pub uid: String,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: Option<String>,
    pub sections: Vec<Section>,
}

/// A headed group of rich text blocks
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Section {
    #[serde(default, deserialize_with = "nullable_string")]
    pub heading: String,
    #[serde(default)]
    pub body: Vec<RichTextBlock>,
}

#[derive(Deserialize)]
struct SummaryFields {
    title: String,
    #[serde(default, deserialize_with = "nullable_string")]
    subtitle: String,
    author: String,
}

#[derive(Deserialize)]
struct DetailFields {
    title: String,
    #[serde(default, deserialize_with = "nullable_string")]
    subtitle: String,
    author: String,
    #[serde(default)]
    banner: Option<Banner>,
    content: Vec<Section>,
}

#[derive(Deserialize)]
struct Banner {
    #[serde(default)]
    url: Option<String>,
}

impl PostSummary {
    /// Keep only the listing fields of a document
    pub fn from_document(doc: &Document) -> Result<Self, ContentError> {
        let fields: SummaryFields = reproject(doc)?;
        Ok(Self {
            uid: require_uid(doc)?,
            first_publication_date: publication_date(doc)?,
            title: fields.title,
            subtitle: fields.subtitle,
            author: fields.author,
        })
    }
}

impl PostDetail {
    pub fn from_document(doc: &Document) -> Result<Self, ContentError> {
        let fields: DetailFields = reproject(doc)?;
        Ok(Self {
            uid: require_uid(doc)?,
            first_publication_date: publication_date(doc)?,
            title: fields.title,
            subtitle: fields.subtitle,
            author: fields.author,
            banner_url: fields.banner.and_then(|b| b.url).filter(|u| !u.is_empty()),
            sections: fields.content,
        })
    }
}

fn reproject<T: serde::de::DeserializeOwned>(doc: &Document) -> Result<T, ContentError> {
    T::deserialize(&doc.data).map_err(|e| {
        ContentError::Malformed(format!(
            "document {} ({}): {}",
            doc.id,
            doc.uid.as_deref().unwrap_or("no uid"),
            e
        ))
    })
}

fn require_uid(doc: &Document) -> Result<String, ContentError> {
    doc.uid
        .clone()
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| ContentError::Malformed(format!("document {} has no uid", doc.id)))
}

fn publication_date(doc: &Document) -> Result<Option<DateTime<FixedOffset>>, ContentError> {
    match doc.first_publication_date.as_deref() {
        None => Ok(None),
        Some(raw) => parse_timestamp(raw).map(Some).ok_or_else(|| {
            ContentError::Malformed(format!("document {}: bad timestamp {:?}", doc.id, raw))
        }),
    }
}

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
