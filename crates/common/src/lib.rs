//! Shared domain types used across all courier crates.

pub mod types;

pub use types::{
    Asset, AssetKind, Button, ButtonAction, DeliveryRequest, FollowupPayload, Markup, RecipientId,
};
