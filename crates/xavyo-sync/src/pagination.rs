//! Continuation token codec.
//!
//! Pagination state crosses call boundaries as an opaque string token that
//! encodes an ordered stack of [`PageState`] frames. The top frame is the
//! listing currently being paged; a fresh frame is pushed when a sub-listing
//! must recurse, and a frame is popped only once its listing is exhausted.
//! An empty token (or empty stack) means the listing is complete.

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// One stack frame identifying which listing is being paged and at what
/// offset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    /// Resource type of the listing being paged.
    #[serde(rename = "type", default)]
    pub resource_type_id: String,

    /// Specific resource the listing belongs to, if any.
    #[serde(rename = "id", default)]
    pub resource_id: String,

    /// Record offset into the listing, formatted as a decimal string.
    /// Empty means offset 0.
    #[serde(rename = "pageToken", default)]
    pub page_token: String,
}

impl PageState {
    /// Create a frame for a listing with no parent resource.
    pub fn new(resource_type_id: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type_id: resource_type_id.into(),
            resource_id: resource_id.into(),
            page_token: String::new(),
        }
    }
}

/// An ordered stack of [`PageState`] frames with push/pop semantics.
///
/// Serializes to the opaque continuation token returned to the host. The
/// codec does not interpret offsets beyond formatting them as decimal
/// strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bag {
    states: Vec<PageState>,
}

impl Bag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a token into a bag. An empty token yields an empty bag.
    pub fn deserialize(token: &str) -> SyncResult<Self> {
        if token.is_empty() {
            return Ok(Self::new());
        }

        serde_json::from_str(token).map_err(|e| SyncError::malformed_token(e.to_string()))
    }

    /// Encode the bag into an opaque token. An empty bag yields the empty
    /// string, signalling that the listing is complete.
    pub fn serialize(&self) -> SyncResult<String> {
        if self.states.is_empty() {
            return Ok(String::new());
        }

        serde_json::to_string(self).map_err(|e| SyncError::malformed_token(e.to_string()))
    }

    /// The current (top) frame.
    pub fn current(&self) -> Option<&PageState> {
        self.states.last()
    }

    /// Push a fresh frame, making it current.
    pub fn push(&mut self, state: PageState) {
        self.states.push(state);
    }

    /// Pop the current frame once its listing is exhausted.
    pub fn pop(&mut self) -> Option<PageState> {
        self.states.pop()
    }

    /// The current frame's page token, or the empty string for a fresh
    /// listing.
    pub fn page_token(&self) -> &str {
        self.current().map_or("", |s| s.page_token.as_str())
    }

    /// Rewrite the current frame's page token and serialize the bag.
    ///
    /// This is the sole mechanism by which an advanced offset is handed back
    /// to the host.
    pub fn next_token(&mut self, page_token: impl Into<String>) -> SyncResult<String> {
        if let Some(state) = self.states.last_mut() {
            state.page_token = page_token.into();
        }

        Bag::serialize(self)
    }
}

/// Decode a continuation token, seeding `seed` at offset 0 when the token is
/// empty, and parse the current frame's page token as a record offset.
pub fn parse_page_token(token: &str, seed: PageState) -> SyncResult<(Bag, u32)> {
    let mut bag = Bag::deserialize(token)?;

    if bag.current().is_none() {
        bag.push(seed);
    }

    let offset = parse_offset(bag.page_token())?;

    Ok((bag, offset))
}

/// Parse a page token as a non-negative decimal offset. Empty means 0.
fn parse_offset(token: &str) -> SyncResult<u32> {
    if token.is_empty() {
        return Ok(0);
    }

    token
        .parse::<u32>()
        .map_err(|e| SyncError::malformed_token(format!("bad page offset '{token}': {e}")))
}
