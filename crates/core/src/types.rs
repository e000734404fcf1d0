/// Annotation identifiers are opaque strings (`anno_` + 8 hex chars when
/// minted by the server). Lexical order is used for group tie-breaking.
pub type AnnotationId = String;

/// Pages are addressed by the image id they annotate (e.g. `"00042"`).
pub type PageId = String;
