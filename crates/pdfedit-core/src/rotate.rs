//! Page rotation

use crate::assemble::load_source;
use crate::error::EditError;
use crate::page::{page_rotation, save_document};
use crate::page_spec::PageSpec;
use lopdf::Object;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Clockwise rotation step; only quarter turns are representable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum RotationDelta {
    Quarter,
    Half,
    ThreeQuarter,
}

impl RotationDelta {
    pub fn degrees(self) -> i64 {
        match self {
            RotationDelta::Quarter => 90,
            RotationDelta::Half => 180,
            RotationDelta::ThreeQuarter => 270,
        }
    }
}

impl TryFrom<i64> for RotationDelta {
    type Error = EditError;

    fn try_from(degrees: i64) -> Result<Self, Self::Error> {
        match degrees {
            90 => Ok(RotationDelta::Quarter),
            180 => Ok(RotationDelta::Half),
            270 => Ok(RotationDelta::ThreeQuarter),
            other => Err(EditError::InvalidRotation(other)),
        }
    }
}

impl From<RotationDelta> for i64 {
    fn from(delta: RotationDelta) -> Self {
        delta.degrees()
    }
}

/// Rotate the pages `spec` selects by `delta`, composing with the rotation
/// each page already has (including one inherited from the page tree)
pub fn rotate_pages(bytes: &[u8], spec: &PageSpec, delta: RotationDelta) -> Result<Vec<u8>, EditError> {
    let mut doc = load_source(bytes)?;
    let pages = doc.get_pages();
    let selected = spec.resolve(pages.len() as u32)?;
    info!(%spec, degrees = delta.degrees(), pages = selected.len(), "Rotating pages");

    for number in selected {
        let Some(&page_id) = pages.get(&number) else {
            continue;
        };
        let rotation = (page_rotation(&doc, page_id) + delta.degrees()).rem_euclid(360);
        doc.get_dictionary_mut(page_id)
            .map_err(EditError::operation)?
            .set("Rotate", Object::Integer(rotation));
    }

    doc.compress();
    save_document(&mut doc)
}
