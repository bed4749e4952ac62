//! The per-frame snapshot handed out by a capture session.
//!
//! Every field is an `Option`: `None` means the backend never produces that
//! kind of data, `Some` with an empty value means it does but had nothing
//! this frame. Accessors flatten both cases to an empty value so callers that
//! don't care about the distinction never have to match.

use crate::capabilities::Capabilities;
use crate::types::{Latency, PointCloud, Pose, Timestamp};
use crate::{MocapError, Result};
use std::collections::BTreeMap;

static NO_RIGID_BODIES: BTreeMap<String, Pose> = BTreeMap::new();
static NO_POINTS: PointCloud = PointCloud::new();

/// One complete frame. All fields describe the same backend frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    sequence: u64,
    rigid_bodies: Option<BTreeMap<String, Pose>>,
    point_cloud: Option<PointCloud>,
    latency: Option<Vec<Latency>>,
    timestamp: Option<Timestamp>,
}

impl Frame {
    pub fn builder(sequence: u64) -> FrameBuilder {
        FrameBuilder {
            frame: Frame {
                sequence,
                ..Frame::default()
            },
        }
    }

    /// Backend frame counter. Strictly increasing across waits on one session.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Which fields this frame carries.
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::empty();
        caps.set(Capabilities::RIGID_BODY_TRACKING, self.rigid_bodies.is_some());
        caps.set(Capabilities::POINT_CLOUD, self.point_cloud.is_some());
        caps.set(Capabilities::LATENCY_ESTIMATE, self.latency.is_some());
        caps.set(Capabilities::TIMESTAMP, self.timestamp.is_some());
        caps
    }

    pub fn rigid_bodies(&self) -> &BTreeMap<String, Pose> {
        self.rigid_bodies.as_ref().unwrap_or(&NO_RIGID_BODIES)
    }

    /// Copy of the named pose.
    pub fn rigid_body_by_name(&self, name: &str) -> Result<Pose> {
        self.rigid_bodies()
            .get(name)
            .cloned()
            .ok_or_else(|| MocapError::NotFound(name.to_string()))
    }

    pub fn point_cloud(&self) -> &PointCloud {
        self.point_cloud.as_ref().unwrap_or(&NO_POINTS)
    }

    pub fn latency(&self) -> &[Latency] {
        self.latency.as_deref().unwrap_or(&[])
    }

    /// Frame time, `Timestamp::ZERO` if the backend has none.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp.unwrap_or(Timestamp::ZERO)
    }

    /// Restrict the frame to `caps`: unsupported fields are dropped, supported
    /// fields the backend left out become present-but-empty.
    pub(crate) fn conform(mut self, caps: Capabilities) -> Frame {
        if caps.rigid_body_tracking() {
            self.rigid_bodies.get_or_insert_with(BTreeMap::new);
        } else {
            self.rigid_bodies = None;
        }
        if caps.point_cloud() {
            self.point_cloud.get_or_insert_with(PointCloud::new);
        } else {
            self.point_cloud = None;
        }
        if caps.latency_estimate() {
            self.latency.get_or_insert_with(Vec::new);
        } else {
            self.latency = None;
        }
        if caps.timestamp() {
            self.timestamp.get_or_insert(Timestamp::ZERO);
        } else {
            self.timestamp = None;
        }
        self
    }
}

/// Assembles a `Frame` inside a backend.
#[derive(Debug)]
pub struct FrameBuilder {
    frame: Frame,
}

impl FrameBuilder {
    /// Add one pose. A later pose with the same name replaces the earlier one.
    pub fn rigid_body(mut self, pose: Pose) -> Self {
        self.frame
            .rigid_bodies
            .get_or_insert_with(BTreeMap::new)
            .insert(pose.name().to_string(), pose);
        self
    }

    /// Mark rigid-body data present and add `poses`, possibly none.
    pub fn rigid_bodies(mut self, poses: impl IntoIterator<Item = Pose>) -> Self {
        let map = self.frame.rigid_bodies.get_or_insert_with(BTreeMap::new);
        for pose in poses {
            map.insert(pose.name().to_string(), pose);
        }
        self
    }

    pub fn point_cloud(mut self, cloud: PointCloud) -> Self {
        self.frame.point_cloud = Some(cloud);
        self
    }

    pub fn latency(mut self, latency: impl IntoIterator<Item = Latency>) -> Self {
        self.frame
            .latency
            .get_or_insert_with(Vec::new)
            .extend(latency);
        self
    }

    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.frame.timestamp = Some(timestamp);
        self
    }

    pub fn build(self) -> Frame {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Quaternion;

    fn pose(name: &str, x: f32) -> Pose {
        Pose::new(name, [x, 0.0, 0.0], Quaternion::IDENTITY, Timestamp::from_micros(7))
    }

    #[test]
    fn test_empty_frame_accessors() {
        let frame = Frame::default();
        assert!(frame.rigid_bodies().is_empty());
        assert!(frame.point_cloud().is_empty());
        assert!(frame.latency().is_empty());
        assert_eq!(frame.timestamp(), Timestamp::ZERO);
        assert!(frame.capabilities().is_empty());
    }

    #[test]
    fn test_lookup_matches_map() {
        let frame = Frame::builder(1)
            .rigid_body(pose("a", 1.0))
            .rigid_body(pose("b", 2.0))
            .build();
        for (name, expected) in frame.rigid_bodies() {
            let found = frame.rigid_body_by_name(name).unwrap();
            assert_eq!(&found, expected);
        }
        match frame.rigid_body_by_name("c") {
            Err(MocapError::NotFound(name)) => assert_eq!(name, "c"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_names_keep_last() {
        let frame = Frame::builder(1)
            .rigid_bodies(vec![pose("a", 1.0), pose("a", 5.0)])
            .build();
        assert_eq!(frame.rigid_bodies().len(), 1);
        assert_eq!(frame.rigid_body_by_name("a").unwrap().position()[0], 5.0);
    }

    #[test]
    fn test_present_but_empty_is_distinct_from_absent() {
        let frame = Frame::builder(3).rigid_bodies(Vec::new()).build();
        assert!(frame.capabilities().rigid_body_tracking());
        assert!(frame.rigid_bodies().is_empty());
        assert!(!frame.capabilities().point_cloud());
    }

    #[test]
    fn test_conform_drops_and_fills() {
        let frame = Frame::builder(2)
            .point_cloud(PointCloud::from_rows(vec![[1.0, 2.0, 3.0]]))
            .timestamp(Timestamp::from_micros(99))
            .build()
            .conform(Capabilities::RIGID_BODY_TRACKING | Capabilities::TIMESTAMP);

        assert_eq!(
            frame.capabilities(),
            Capabilities::RIGID_BODY_TRACKING | Capabilities::TIMESTAMP
        );
        assert!(frame.point_cloud().is_empty());
        assert!(frame.rigid_bodies().is_empty());
        assert_eq!(frame.timestamp().as_micros(), 99);
        assert_eq!(frame.sequence(), 2);
    }
}
