//! Hover and select grab points on one grabbable

use serde::{Deserialize, Serialize};

use crate::events::{PointerEvent, PointerEventType};
use crate::transform::Pose;

/// One logical grab point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GrabPose {
    /// Stable per grab channel, unique within a collection
    pub identifier: u32,
    /// Current pose of the grab point
    pub pose: Pose,
}

impl GrabPose {
    /// Create a new grab pose
    pub fn new(identifier: u32, pose: Pose) -> Self {
        Self { identifier, pose }
    }
}

/// Grab points currently hovering and selecting a grabbable
///
/// Each sequence holds at most one entry per identifier. Lookups are linear;
/// there are rarely more than a couple of hands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrabPoseCollection {
    hover_poses: Vec<GrabPose>,
    select_poses: Vec<GrabPose>,
}

impl GrabPoseCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Hovering grab points
    pub fn hover_poses(&self) -> &[GrabPose] {
        &self.hover_poses
    }

    /// Selecting grab points
    pub fn select_poses(&self) -> &[GrabPose] {
        &self.select_poses
    }

    /// Find a hovering grab point
    pub fn find_hover(&self, identifier: u32) -> Option<&GrabPose> {
        self.hover_poses.iter().find(|p| p.identifier == identifier)
    }

    /// Find a selecting grab point
    pub fn find_select(&self, identifier: u32) -> Option<&GrabPose> {
        self.select_poses.iter().find(|p| p.identifier == identifier)
    }

    /// Add a hover point unless one with the same identifier exists
    pub fn hover(&mut self, pose: GrabPose) {
        add_unique(&mut self.hover_poses, pose);
    }

    /// Remove a hover point
    pub fn unhover(&mut self, identifier: u32) {
        self.hover_poses.retain(|p| p.identifier != identifier);
    }

    /// Add a select point unless one with the same identifier exists
    pub fn select(&mut self, pose: GrabPose) {
        add_unique(&mut self.select_poses, pose);
    }

    /// Remove a select point
    pub fn unselect(&mut self, identifier: u32) {
        self.select_poses.retain(|p| p.identifier != identifier);
    }

    /// Update the pose of a point in both sequences
    pub fn move_pose(&mut self, pose: GrabPose) {
        for existing in self
            .hover_poses
            .iter_mut()
            .chain(self.select_poses.iter_mut())
            .filter(|p| p.identifier == pose.identifier)
        {
            existing.pose = pose.pose;
        }
    }

    /// Remove a point from both sequences
    pub fn cancel(&mut self, identifier: u32) {
        self.unselect(identifier);
        self.unhover(identifier);
    }

    /// Apply a pointer event
    pub fn update_from_event(&mut self, event: &PointerEvent) {
        let pose = GrabPose::new(event.identifier, event.pose);
        match event.kind {
            PointerEventType::Hover => self.hover(pose),
            PointerEventType::Unhover => self.unhover(event.identifier),
            PointerEventType::Select => self.select(pose),
            PointerEventType::Unselect => self.unselect(event.identifier),
            PointerEventType::Move => self.move_pose(pose),
            PointerEventType::Cancel => self.cancel(event.identifier),
        }
    }

    /// Drop every point
    pub fn clear(&mut self) {
        self.hover_poses.clear();
        self.select_poses.clear();
    }
}

fn add_unique(poses: &mut Vec<GrabPose>, pose: GrabPose) {
    if !poses.iter().any(|p| p.identifier == pose.identifier) {
        poses.push(pose);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn pose_at(id: u32, x: f32) -> GrabPose {
        GrabPose::new(id, Pose::new(Vec3::new(x, 0.0, 0.0), Quat::IDENTITY))
    }

    #[test]
    fn test_select_is_unique_per_identifier() {
        let mut c = GrabPoseCollection::new();
        c.select(pose_at(1, 0.0));
        c.select(pose_at(1, 5.0));
        assert_eq!(c.select_poses().len(), 1);
        assert_eq!(c.select_poses()[0].pose.position.x, 0.0);
    }

    #[test]
    fn test_move_updates_both_sequences() {
        let mut c = GrabPoseCollection::new();
        c.hover(pose_at(1, 0.0));
        c.select(pose_at(1, 0.0));
        c.select(pose_at(2, 0.0));
        c.move_pose(pose_at(1, 3.0));
        assert_eq!(c.find_hover(1).map(|p| p.pose.position.x), Some(3.0));
        assert_eq!(c.find_select(1).map(|p| p.pose.position.x), Some(3.0));
        assert_eq!(c.find_select(2).map(|p| p.pose.position.x), Some(0.0));
    }

    #[test]
    fn test_cancel_removes_everywhere() {
        let mut c = GrabPoseCollection::new();
        c.hover(pose_at(4, 0.0));
        c.select(pose_at(4, 0.0));
        c.cancel(4);
        assert!(c.hover_poses().is_empty());
        assert!(c.select_poses().is_empty());
    }

    #[test]
    fn test_hover_and_select_are_independent() {
        let mut c = GrabPoseCollection::new();
        c.select(pose_at(1, 0.0));
        c.unhover(1);
        assert_eq!(c.select_poses().len(), 1);
        assert!(c.find_hover(1).is_none());
    }
}
