//! Tick-quantized sprite animation.
//!
//! Every stateful entity maps its behaviour state to a [`FrameTag`] and calls
//! [`advance_frame`] once per tick, after its state transition logic. A state
//! change is visible immediately because a frame outside the new tag's range
//! restarts the animation on the same tick.

use escort_common::{Coord, EntityId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Number of simulation ticks each animation frame is held for.
pub const TICKS_PER_FRAME: u64 = 5;

/// Errors that can occur when reading sprite metadata.
#[derive(Debug, Error)]
pub enum AnimationError {
    /// Sprite metadata could not be parsed
    #[error("invalid sprite metadata: {0}")]
    InvalidMetadata(#[from] serde_json::Error),

    /// A frame tag ends before it starts
    #[error("frame tag '{name}' has from={from} > to={to}")]
    InvertedRange {
        /// Tag name
        name: String,
        /// First frame
        from: usize,
        /// Last frame
        to: usize,
    },

    /// A required tag is missing from the table
    #[error("frame tag '{0}' not found")]
    MissingTag(String),
}

/// Inclusive range of sprite frames bound to a named animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameTag {
    /// First frame of the animation
    pub from: usize,
    /// Last frame of the animation
    pub to: usize,
}

impl FrameTag {
    /// Creates a new frame tag.
    #[must_use]
    pub const fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    /// Creates a single-frame tag.
    #[must_use]
    pub const fn single(frame: usize) -> Self {
        Self {
            from: frame,
            to: frame,
        }
    }

    /// Returns true if the frame is the last frame of this animation.
    #[must_use]
    pub const fn is_last(&self, frame: usize) -> bool {
        frame == self.to
    }
}

/// Determines the next animation frame.
///
/// A frame outside `[from, to)` restarts the animation at `from`, which also
/// covers wrapping once the last frame was shown. Inside the range the frame
/// only moves on every fifth tick.
#[must_use]
pub fn advance_frame(frame: usize, tick: u64, tag: FrameTag) -> usize {
    if frame < tag.from || frame >= tag.to {
        return tag.from;
    }

    if tick % TICKS_PER_FRAME != 0 {
        return frame;
    }

    frame + 1
}

/// Per-tick snapshot of an entity handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityPose {
    /// Entity id
    pub id: EntityId,
    /// World position
    pub position: Coord,
    /// Facing angle in radians
    pub angle: f32,
    /// Sprite frame index
    pub frame: usize,
}

/// Frame tag entry as stored in sprite sheet metadata.
#[derive(Debug, Clone, Deserialize)]
struct RawFrameTag {
    name: String,
    from: usize,
    to: usize,
}

#[derive(Debug, Deserialize)]
struct RawSpriteMeta {
    #[serde(rename = "frameTags", default)]
    frame_tags: Vec<RawFrameTag>,
}

#[derive(Debug, Deserialize)]
struct RawSpriteSheet {
    meta: RawSpriteMeta,
}

/// Named frame tags of one sprite sheet, loaded once at level start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameTagTable {
    tags: HashMap<String, FrameTag>,
    order: Vec<String>,
}

impl FrameTagTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a named tag.
    pub fn insert(&mut self, name: impl Into<String>, tag: FrameTag) {
        let name = name.into();
        if self.tags.insert(name.clone(), tag).is_none() {
            self.order.push(name);
        }
    }

    /// Builder variant of [`Self::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, tag: FrameTag) -> Self {
        self.insert(name, tag);
        self
    }

    /// Parses the `meta.frameTags` array of an Aseprite-style sprite sheet.
    pub fn from_sprite_json(json: &str) -> Result<Self, AnimationError> {
        let sheet: RawSpriteSheet = serde_json::from_str(json)?;
        let mut table = Self::new();
        for raw in sheet.meta.frame_tags {
            if raw.from > raw.to {
                return Err(AnimationError::InvertedRange {
                    name: raw.name,
                    from: raw.from,
                    to: raw.to,
                });
            }
            table.insert(raw.name, FrameTag::new(raw.from, raw.to));
        }
        Ok(table)
    }

    /// Looks up a tag by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<FrameTag> {
        self.tags.get(name).copied()
    }

    /// Looks up a tag by name, failing if it is missing.
    pub fn require(&self, name: &str) -> Result<FrameTag, AnimationError> {
        self.get(name)
            .ok_or_else(|| AnimationError::MissingTag(name.to_string()))
    }

    /// Looks up a tag by its position in the sprite metadata.
    #[must_use]
    pub fn by_index(&self, index: usize) -> Option<FrameTag> {
        self.order.get(index).and_then(|name| self.get(name))
    }

    /// Returns the number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the table has no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_advance_frame_cases() {
        let cases = [
            (0, 1, 2, FrameTag::new(0, 7), "increments frame mid-loop"),
            (0, 7, 0, FrameTag::new(0, 7), "wraps to the first frame"),
            (0, 9, 0, FrameTag::new(0, 7), "interrupts from above the range"),
            (0, 9, 10, FrameTag::new(9, 10), "toggles two frames"),
            (0, 10, 9, FrameTag::new(9, 10), "wraps two frames"),
            (0, 1, 9, FrameTag::new(9, 10), "interrupts from below the range"),
            (0, 8, 8, FrameTag::single(8), "single frame stays in place"),
            (1, 1, 1, FrameTag::new(0, 7), "holds on ticks not divisible by 5"),
            (10, 1, 2, FrameTag::new(0, 7), "increments on ticks divisible by 5"),
            (1, 1, 9, FrameTag::new(9, 10), "interrupts regardless of tick"),
            (1, 7, 8, FrameTag::single(8), "interrupts into a single frame"),
        ];
        for (tick, frame, want, tag, reason) in cases {
            assert_eq!(
                advance_frame(frame, tick, tag),
                want,
                "frame {frame} in {tag:?} at tick {tick}: {reason}"
            );
        }
    }

    #[test]
    fn test_advance_frame_reaches_last_frame() {
        let tag = FrameTag::new(0, 3);
        let mut frame = 0;
        let mut seen_last = false;
        for tick in 0..40 {
            frame = advance_frame(frame, tick, tag);
            seen_last |= tag.is_last(frame);
            assert!(frame <= tag.to);
        }
        assert!(seen_last);
    }

    #[test]
    fn test_frame_tag_table_from_sprite_json() {
        let json = r#"{
            "frames": [],
            "meta": {
                "image": "dog.png",
                "frameTags": [
                    {"name": "Walk", "from": 0, "to": 7, "direction": "forward"},
                    {"name": "Sniff", "from": 8, "to": 11, "direction": "forward"},
                    {"name": "Idle", "from": 12, "to": 12, "direction": "forward"}
                ]
            }
        }"#;
        let table = FrameTagTable::from_sprite_json(json).expect("valid metadata");
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("Sniff"), Some(FrameTag::new(8, 11)));
        assert_eq!(table.by_index(2), Some(FrameTag::single(12)));
        assert!(table.require("Run").is_err());
    }

    #[test]
    fn test_frame_tag_table_rejects_inverted_range() {
        let json = r#"{"meta": {"frameTags": [{"name": "Bad", "from": 5, "to": 2}]}}"#;
        let err = FrameTagTable::from_sprite_json(json).expect_err("inverted range");
        assert!(matches!(err, AnimationError::InvertedRange { .. }));
    }

    proptest! {
        #[test]
        fn prop_out_of_range_resets(from in 0usize..50, len in 0usize..20, offset in 1usize..50, tick in 0u64..1000) {
            let tag = FrameTag::new(from, from + len);
            let above = tag.to + offset;
            prop_assert_eq!(advance_frame(above, tick, tag), tag.from);
            if from >= offset {
                prop_assert_eq!(advance_frame(from - offset, tick, tag), tag.from);
            }
        }

        #[test]
        fn prop_in_range_changes_only_on_fifth_tick(from in 0usize..50, len in 1usize..20, pick in 0usize..20, tick in 0u64..1000) {
            let tag = FrameTag::new(from, from + len);
            let frame = from + pick % len;
            let next = advance_frame(frame, tick, tag);
            if tick % TICKS_PER_FRAME == 0 {
                prop_assert_eq!(next, frame + 1);
            } else {
                prop_assert_eq!(next, frame);
            }
        }
    }
}
