//! Marked-content tags (`BMC`/`BDC`/`EMC`) and the tag hierarchy snapshot
//! attached to every render event.

use std::sync::Arc;

/// One marked-content sequence: its role plus the properties the render
/// events care about.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanvasTag {
    /// Tag name, e.g. `P`, `Span`, `Artifact`.
    pub role: String,
    /// Marked-content identifier linking to the structure tree.
    pub mcid: Option<i64>,
    /// `/ActualText` replacement text.
    pub actual_text: Option<String>,
    /// `/E` expansion of an abbreviation.
    pub expansion_text: Option<String>,
    /// `/Alt` alternate description.
    pub alternate_description: Option<String>,
}

impl CanvasTag {
    /// A tag with only a role, as produced by `BMC`.
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            ..Self::default()
        }
    }

    pub fn with_mcid(mut self, mcid: i64) -> Self {
        self.mcid = Some(mcid);
        self
    }

    pub fn with_actual_text(mut self, text: impl Into<String>) -> Self {
        self.actual_text = Some(text.into());
        self
    }

    pub fn with_expansion_text(mut self, text: impl Into<String>) -> Self {
        self.expansion_text = Some(text.into());
        self
    }

    pub fn has_mcid(&self) -> bool {
        self.mcid.is_some()
    }

    pub fn is_reversed_chars(&self) -> bool {
        self.role == "ReversedChars"
    }
}

/// Snapshot of the marked-content stack.
///
/// Cloning is cheap: the tags are shared behind an [`Arc`] and copied only
/// when the owner mutates a snapshot that someone else still holds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagHierarchy {
    /// Outermost first.
    tags: Arc<Vec<CanvasTag>>,
}

impl TagHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: CanvasTag) {
        Arc::make_mut(&mut self.tags).push(tag);
    }

    /// Pop the innermost tag. Returns `None` on an empty hierarchy.
    pub fn pop(&mut self) -> Option<CanvasTag> {
        if self.tags.is_empty() {
            return None;
        }
        Arc::make_mut(&mut self.tags).pop()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// The innermost (most recently opened) tag.
    pub fn innermost(&self) -> Option<&CanvasTag> {
        self.tags.last()
    }

    /// Tags from innermost to outermost.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &CanvasTag> + '_ {
        self.tags.iter().rev()
    }

    /// MCID of the innermost tag that carries one.
    pub fn mcid(&self) -> Option<i64> {
        self.iter().find_map(|t| t.mcid)
    }

    /// Whether `mcid` occurs in the hierarchy.
    ///
    /// With `innermost_only`, only the MCID that [`mcid`](Self::mcid) would
    /// report is compared; otherwise every tag is checked.
    pub fn has_mcid(&self, mcid: i64, innermost_only: bool) -> bool {
        if innermost_only {
            return self.mcid() == Some(mcid);
        }
        self.iter().any(|t| t.mcid == Some(mcid))
    }

    /// `/ActualText` of the innermost tag that carries one.
    pub fn actual_text(&self) -> Option<&str> {
        self.iter().find_map(|t| t.actual_text.as_deref())
    }

    /// `/E` of the innermost tag that carries one.
    pub fn expansion_text(&self) -> Option<&str> {
        self.iter().find_map(|t| t.expansion_text.as_deref())
    }

    pub fn is_reversed_chars(&self) -> bool {
        self.iter().any(CanvasTag::is_reversed_chars)
    }

    pub fn to_vec(&self) -> Vec<CanvasTag> {
        self.iter().cloned().collect()
    }
}
