//! Annotation records, the type catalogue, and page documents.
//!
//! Field names match the REST wire format: `bbox` is `{x, y, width, height}`,
//! `type` is a snake_case string, and `order` is a 1-based reading position.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geometry::BoundingBox;
use crate::types::{AnnotationId, PageId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Placeholder text stored for sound effects created without any text.
pub const SOUND_EFFECT_PLACEHOLDER: &str = "(擬音)";

/// Prefix of server-minted annotation ids.
pub const ANNOTATION_ID_PREFIX: &str = "anno_";

// ---------------------------------------------------------------------------
// Annotation types
// ---------------------------------------------------------------------------

/// Classification of an annotated region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationType {
    Dialogue,
    Monologue,
    Whisper,
    Narration,
    SoundEffect,
    Ruby,
    Footnote,
    Title,
    Person,
    Face,
    BodyPart,
    Object,
    Panel,
}

const VALID_TYPE_STRINGS: &[&str] = &[
    "dialogue",
    "monologue",
    "whisper",
    "narration",
    "sound_effect",
    "ruby",
    "footnote",
    "title",
    "person",
    "face",
    "body_part",
    "object",
    "panel",
];

impl AnnotationType {
    pub const ALL: [AnnotationType; 13] = [
        Self::Dialogue,
        Self::Monologue,
        Self::Whisper,
        Self::Narration,
        Self::SoundEffect,
        Self::Ruby,
        Self::Footnote,
        Self::Title,
        Self::Person,
        Self::Face,
        Self::BodyPart,
        Self::Object,
        Self::Panel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dialogue => "dialogue",
            Self::Monologue => "monologue",
            Self::Whisper => "whisper",
            Self::Narration => "narration",
            Self::SoundEffect => "sound_effect",
            Self::Ruby => "ruby",
            Self::Footnote => "footnote",
            Self::Title => "title",
            Self::Person => "person",
            Self::Face => "face",
            Self::BodyPart => "body_part",
            Self::Object => "object",
            Self::Panel => "panel",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid annotation type '{s}'. Must be one of: {}",
                    VALID_TYPE_STRINGS.join(", ")
                ))
            })
    }

    /// Display label shown in the editor UI.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dialogue => "セリフ",
            Self::Monologue => "モノローグ",
            Self::Whisper => "小声",
            Self::Narration => "ナレーション",
            Self::SoundEffect => "効果音",
            Self::Ruby => "ルビ",
            Self::Footnote => "注釈 (※)",
            Self::Title => "タイトル",
            Self::Person => "人物",
            Self::Face => "顔",
            Self::BodyPart => "部位",
            Self::Object => "物体",
            Self::Panel => "コマ",
        }
    }

    /// Text-bearing types whose content comes from OCR.
    pub fn is_ocr_target(&self) -> bool {
        matches!(
            self,
            Self::Dialogue
                | Self::Monologue
                | Self::Whisper
                | Self::Narration
                | Self::Ruby
                | Self::SoundEffect
                | Self::Title
                | Self::Footnote
        )
    }

    /// Figure types whose content comes from the image tagger.
    pub fn is_tagger_target(&self) -> bool {
        matches!(self, Self::Person | Self::BodyPart | Self::Object)
    }

    /// Types that may share an order slot when they depict the same character.
    pub fn is_character_figure(&self) -> bool {
        matches!(self, Self::Face | Self::Person | Self::BodyPart | Self::Object)
    }
}

/// Sub-classification, only meaningful for [`AnnotationType::BodyPart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPartSubtype {
    Penis,
    Vagina,
    Other,
}

impl BodyPartSubtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Penis => "penis",
            Self::Vagina => "vagina",
            Self::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "penis" => Ok(Self::Penis),
            "vagina" => Ok(Self::Vagina),
            "other" => Ok(Self::Other),
            _ => Err(CoreError::Validation(format!(
                "Invalid body part subtype '{s}'. Must be one of: penis, vagina, other"
            ))),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Penis => "チンポ",
            Self::Vagina => "マンコ",
            Self::Other => "その他",
        }
    }
}

/// Subtype is kept only for body parts; body parts without one get `Other`.
pub fn normalize_subtype(
    kind: AnnotationType,
    subtype: Option<BodyPartSubtype>,
) -> Option<BodyPartSubtype> {
    match kind {
        AnnotationType::BodyPart => Some(subtype.unwrap_or(BodyPartSubtype::Other)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One classified region on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    #[serde(rename = "type")]
    pub kind: AnnotationType,
    #[serde(default)]
    pub subtype: Option<BodyPartSubtype>,
    pub order: u32,
    #[serde(alias = "bbox_abs")]
    pub bbox: BoundingBox,
    /// Relative coordinates (`0..1`), filled in by the server when the
    /// image size is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox_rel: Option<BoundingBox>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub character_id: Option<String>,
}

/// Payload for creating or fully replacing an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDraft {
    pub image_id: PageId,
    #[serde(rename = "type")]
    pub kind: AnnotationType,
    #[serde(default)]
    pub subtype: Option<BodyPartSubtype>,
    /// `None` on create means "append at the end".
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(alias = "bbox_abs")]
    pub bbox: BoundingBox,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub character_id: Option<String>,
}

impl AnnotationDraft {
    /// Draft that replaces `annotation` with its current values.
    pub fn from_annotation(image_id: &str, annotation: &Annotation) -> Self {
        Self {
            image_id: image_id.to_string(),
            kind: annotation.kind,
            subtype: annotation.subtype,
            order: Some(annotation.order),
            bbox: annotation.bbox,
            text: annotation.text.clone(),
            character_id: annotation.character_id.clone(),
        }
    }

    /// Apply the create-time normalisation rules: subtype only for body
    /// parts, empty character ids dropped, placeholder text for silent
    /// sound effects.
    pub fn normalized(mut self) -> Self {
        self.subtype = normalize_subtype(self.kind, self.subtype);
        if self
            .character_id
            .as_deref()
            .is_some_and(|c| c.trim().is_empty())
        {
            self.character_id = None;
        }
        if self.kind == AnnotationType::SoundEffect && self.text.trim().is_empty() {
            self.text = SOUND_EFFECT_PLACEHOLDER.to_string();
        }
        self
    }
}

/// Pixel dimensions of a page image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Everything stored for one page: metadata plus its annotations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageAnnotations {
    pub image_id: PageId,
    #[serde(default)]
    pub image_filename: String,
    #[serde(default)]
    pub image_size: ImageSize,
    #[serde(default)]
    pub page_summary: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl PageAnnotations {
    pub fn empty(image_id: impl Into<PageId>) -> Self {
        Self {
            image_id: image_id.into(),
            ..Default::default()
        }
    }

    pub fn find(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }
}

/// One page image and its annotation status, as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageListing {
    pub id: PageId,
    pub has_annotation: bool,
    pub is_completed: bool,
}

/// Mint a fresh annotation id (`anno_` + 8 lowercase hex chars).
pub fn new_annotation_id() -> AnnotationId {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("{ANNOTATION_ID_PREFIX}{}", &hex[..8])
}

/// Convert an absolute box to image-relative coordinates.
///
/// Returns `None` when the image size is unknown (zero on either axis).
pub fn relative_box(bbox: &BoundingBox, size: ImageSize) -> Option<BoundingBox> {
    if size.width == 0 || size.height == 0 {
        return None;
    }
    let w = f64::from(size.width);
    let h = f64::from(size.height);
    Some(BoundingBox::new(
        bbox.x / w,
        bbox.y / h,
        bbox.width / w,
        bbox.height / h,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
