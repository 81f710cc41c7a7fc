use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Marker flags attached to an overlay event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayFlags {
    /// The displayed amount was set by a moderator override
    AdminOverride,
}

/// An ephemeral display event fanned out to a room.
///
/// Overlays exist only for the duration of delivery (plus a short trailing
/// buffer for late subscribers); they are never persisted and are not
/// authoritative. State reconstruction always comes from the auction and
/// bid records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OverlayEvent {
    /// The amount to display
    pub amount_cents: i64,

    /// The bidder's display name
    pub username: String,

    /// Optional display flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<OverlayFlags>,
}
