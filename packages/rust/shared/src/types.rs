//! Core domain types for the curriculum content tree.

use serde::{Deserialize, Serialize};

use crate::error::{ChefError, Result};

/// Marker value for the intermediate crawl file's `kind` field.
pub const RESOURCE_TREE_KIND: &str = "CurriculumResourceTree";

// ---------------------------------------------------------------------------
// CollectionType
// ---------------------------------------------------------------------------

/// The five curriculum page layouts the site publishes.
///
/// The wire form (search index and URL path segment) is the plural
/// collection name; anything else is a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionType {
    #[serde(rename = "Activities")]
    Activity,
    #[serde(rename = "Lessons")]
    Lesson,
    #[serde(rename = "CurricularUnits")]
    CurricularUnit,
    #[serde(rename = "Sprinkles")]
    Sprinkle,
    #[serde(rename = "MakerChallenges")]
    MakerChallenge,
}

impl CollectionType {
    /// The plural collection name used in resource URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activity => "Activities",
            Self::Lesson => "Lessons",
            Self::CurricularUnit => "CurricularUnits",
            Self::Sprinkle => "Sprinkles",
            Self::MakerChallenge => "MakerChallenges",
        }
    }

    /// Resource URLs use the lowercased collection segment, e.g.
    /// `activities/view/<id>`.
    pub fn url_segment(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl std::fmt::Display for CollectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CollectionType {
    type Err = ChefError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Activities" => Ok(Self::Activity),
            "Lessons" => Ok(Self::Lesson),
            "CurricularUnits" => Ok(Self::CurricularUnit),
            "Sprinkles" => Ok(Self::Sprinkle),
            "MakerChallenges" => Ok(Self::MakerChallenge),
            other => Err(ChefError::config(format!(
                "unknown collection type: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ResourceDescriptor / ResourceTree
// ---------------------------------------------------------------------------

/// One curriculum resource enumerated by discovery.
///
/// Immutable; consumed once per collection assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Site-unique resource identifier (URL slug).
    pub id: String,
    /// Full resource URL (English variant).
    pub url: String,
    /// Full URL of the Spanish variant, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spanish_url: Option<String>,
    /// Identifier of the Spanish variant, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spanish_version_id: Option<String>,
    /// Which page layout this resource uses.
    pub collection: CollectionType,
    /// Display title.
    pub title: String,
    /// Short summary from the search index.
    #[serde(default)]
    pub summary: String,
    /// Target grade.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_target: Option<i64>,
    /// Grade range around the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_range: Option<i64>,
}

/// The intermediate crawl file shared between the crawl and scrape phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTree {
    /// Always [`RESOURCE_TREE_KIND`]; validated on read.
    pub kind: String,
    /// Channel title.
    pub title: String,
    /// All discovered resources, in index order.
    pub children: Vec<ResourceDescriptor>,
}

impl ResourceTree {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            kind: RESOURCE_TREE_KIND.to_string(),
            title: title.into(),
            children: Vec::new(),
        }
    }

    /// Reject trees written by a different tool or schema.
    pub fn validate(&self) -> Result<()> {
        if self.kind != RESOURCE_TREE_KIND {
            return Err(ChefError::validation(format!(
                "unexpected resource tree kind: {} (expected {RESOURCE_TREE_KIND})",
                self.kind
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// License
// ---------------------------------------------------------------------------

/// License identifier for CC BY content.
pub const CC_BY: &str = "CC BY";

/// License metadata attached to every content node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseInfo {
    pub license_id: String,
    pub copyright_holder: String,
}

impl LicenseInfo {
    /// CC BY with the given copyright holder.
    pub fn cc_by(holder: impl Into<String>) -> Self {
        Self {
            license_id: CC_BY.to_string(),
            copyright_holder: holder.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ContentNode
// ---------------------------------------------------------------------------

/// Node kinds in the published content tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Topic,
    Html5,
    Document,
    Video,
}

/// A file attached to a content node, tagged by `file_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "file_type", rename_all = "lowercase")]
pub enum FileRef {
    Html5 { path: String },
    Document { path: String },
    Video { path: String },
    Subtitles { youtube_id: String, language: String },
}

/// A node in the content tree handed to the tree writer.
///
/// Ownership is strictly tree-shaped; cross-references between curricular
/// units and their lessons are resolved by URL lookup, never by sharing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentNode {
    pub kind: ContentKind,
    /// Globally unique cross-reference key (usually the resource URL).
    pub source_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<LicenseInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileRef>,
    /// True while this node stands in for a subtree that has not been
    /// composed yet. Resolved (replaced or dropped) before serialization.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
}

impl ContentNode {
    /// A topic (folder) node with no files.
    pub fn topic(source_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Topic,
            source_id: source_id.into(),
            title: title.into(),
            description: String::new(),
            language: "en".into(),
            license: None,
            children: Vec::new(),
            files: Vec::new(),
            placeholder: false,
        }
    }

    /// A stand-in node for a cross-referenced subtree composed later.
    pub fn placeholder(source_id: impl Into<String>) -> Self {
        let mut node = Self::topic(source_id, "");
        node.placeholder = true;
        node
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_license(mut self, license: LicenseInfo) -> Self {
        self.license = Some(license);
        self
    }

    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_files(mut self, files: Vec<FileRef>) -> Self {
        self.files = files;
        self
    }
}

// ---------------------------------------------------------------------------
// ChannelTree
// ---------------------------------------------------------------------------

/// Root of the final content tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelTree {
    pub source_domain: String,
    pub source_id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<LicenseInfo>,
    #[serde(default)]
    pub children: Vec<ContentNode>,
}
