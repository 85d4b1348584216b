pub mod bbox;
pub mod keypoint;
pub mod selection;

pub use bbox::{bbox_from_keypoints, BBox};
pub use keypoint::{Keypoint, KeypointIndex, Pose};
pub use selection::{
    ClosestToPrevious, HighestConfidence, LargestBox, PlayerSelector, SelectionPolicy,
};
