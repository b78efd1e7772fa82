//! Description keys and kinds.
//!
//! Keys fall into three classes:
//!
//! - reserved (`$`-prefixed): structure and lifecycle, never written to the host
//! - private (`_`-prefixed): contextual state, inherited by descendants
//! - public: everything else, mirrored onto host attributes and properties

use crate::value::{Gene, Value};

pub const TYPE: &str = "$type";
pub const TEXT: &str = "$text";
pub const HTML: &str = "$html";
pub const COMPONENTS: &str = "$components";
pub const INIT: &str = "$init";
pub const UPDATE: &str = "$update";
pub const VIRUS: &str = "$virus";
pub const CELL: &str = "$cell";

/// Keys every live node intercepts even when its description omits them.
pub const TRACKED: [&str; 4] = [TYPE, TEXT, HTML, COMPONENTS];

pub const RESERVED_PREFIX: char = '$';
pub const PRIVATE_PREFIX: char = '_';

/// Kind used when a description names none.
pub const DEFAULT_KIND: &str = "div";
pub const FRAGMENT_KIND: &str = "fragment";
pub const TEXT_KIND: &str = "text";
pub const SVG_KIND: &str = "svg";

/// Document regions that are reused instead of created.
pub const REGION_KINDS: [&str; 2] = ["head", "body"];

pub fn is_reserved(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

pub fn is_private(key: &str) -> bool {
    key.starts_with(PRIVATE_PREFIX)
}

/// Neither reserved nor private.
pub fn is_public(key: &str) -> bool {
    !is_reserved(key) && !is_private(key)
}

/// Requested kind, if the description names one.
pub fn kind_of(gene: &Gene) -> Option<&str> {
    gene.get(TYPE).and_then(Value::as_str)
}

/// Whether the description is marked for top-level mounting.
pub fn is_cell(gene: &Gene) -> bool {
    gene.contains_key(CELL)
}
