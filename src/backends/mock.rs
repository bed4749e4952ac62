//! Synthetic backend producing a fixed scene at a fixed rate.
//!
//! Config keys:
//! - `rate`: frames per second, default 100. `0` delivers frames as fast as
//!   they are requested.
//! - `rigid_bodies`: `name(x,y,z)` or `name(x,y,z,qw,qx,qy,qz)` entries
//!   separated by `;`.
//! - `markers`: `x,y,z` rows separated by `;`.
//! - `latency`: seconds, reported as stage `"mock"`.
//! - `fail_after`: frames to deliver before simulating a lost transport.

use crate::backend::Backend;
use crate::capabilities::Capabilities;
use crate::config::Config;
use crate::error::{BackendError, ConfigError};
use crate::frame::Frame;
use crate::types::{Latency, PointCloud, Pose, Quaternion, Timestamp};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
struct MockBody {
    name: String,
    position: [f32; 3],
    rotation: Quaternion,
}

#[derive(Debug)]
pub struct MockBackend {
    period: Option<Duration>,
    bodies: Vec<MockBody>,
    markers: PointCloud,
    latency: Option<f64>,
    fail_after: Option<u64>,
    epoch: Instant,
    next_deadline: Instant,
    sequence: u64,
}

impl MockBackend {
    pub const ID: &'static str = "mock";
    pub const CAPABILITIES: Capabilities = Capabilities::all();
    pub const DEFAULT_RATE_HZ: f64 = 100.0;

    /// Empty, unpaced scene. See `with_rate`.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            period: None,
            bodies: Vec::new(),
            markers: PointCloud::new(),
            latency: None,
            fail_after: None,
            epoch: now,
            next_deadline: now,
            sequence: 0,
        }
    }

    /// Pace frames at `rate_hz` frames per second; 0 delivers them as fast
    /// as they are requested.
    pub fn with_rate(mut self, rate_hz: f64) -> Result<Self, ConfigError> {
        let rate_error = |reason: &str| ConfigError::Invalid {
            key: "rate".to_string(),
            value: rate_hz.to_string(),
            reason: reason.to_string(),
        };
        if !rate_hz.is_finite() || rate_hz < 0.0 {
            return Err(rate_error("must be a non-negative number of Hz"));
        }
        self.period = if rate_hz > 0.0 {
            let period = Duration::try_from_secs_f64(1.0 / rate_hz)
                .ok()
                .filter(|p| Instant::now().checked_add(*p).is_some())
                .ok_or_else(|| rate_error("frame period out of range"))?;
            Some(period)
        } else {
            None
        };
        Ok(self)
    }

    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let rate: f64 = cfg.parse_or("rate", Self::DEFAULT_RATE_HZ)?;
        let mut backend = Self::new().with_rate(rate)?;

        if let Some(raw) = cfg.get("rigid_bodies") {
            backend.bodies =
                parse_rigid_bodies(raw).map_err(|reason| invalid(cfg, "rigid_bodies", &reason))?;
        }
        if let Some(raw) = cfg.get("markers") {
            backend.markers =
                parse_markers(raw).map_err(|reason| invalid(cfg, "markers", &reason))?;
        }
        if let Some(latency) = cfg.parse::<f64>("latency")? {
            if !latency.is_finite() || latency < 0.0 {
                return Err(invalid(cfg, "latency", "must be non-negative seconds"));
            }
            backend.latency = Some(latency);
        }
        backend.fail_after = cfg.parse("fail_after")?;

        log::debug!(
            "Mock backend: rate={}Hz bodies={} markers={}",
            rate,
            backend.bodies.len(),
            backend.markers.len()
        );
        Ok(backend)
    }

    pub fn with_rigid_body(
        mut self,
        name: impl Into<String>,
        position: [f32; 3],
        rotation: Quaternion,
    ) -> Self {
        self.bodies.push(MockBody {
            name: name.into(),
            position,
            rotation,
        });
        self
    }

    pub fn with_markers(mut self, markers: PointCloud) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_latency(mut self, seconds: f64) -> Self {
        self.latency = Some(seconds);
        self
    }

    /// Deliver `frames` frames, then fail as if the transport dropped.
    pub fn fail_after(mut self, frames: u64) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Sleep until the next frame is due. Falls back onto the current time
    /// instead of bursting when the caller polls too slowly.
    fn pace(&mut self) {
        let Some(period) = self.period else {
            return;
        };
        let now = Instant::now();
        if self.next_deadline > now {
            std::thread::sleep(self.next_deadline - now);
        }
        let base = self.next_deadline.max(now);
        self.next_deadline = base.checked_add(period).unwrap_or(base);
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MockBackend {
    fn name(&self) -> &str {
        Self::ID
    }

    fn capabilities(&self) -> Capabilities {
        Self::CAPABILITIES
    }

    fn next_frame(&mut self) -> Result<Frame, BackendError> {
        if let Some(limit) = self.fail_after {
            if self.sequence >= limit {
                return Err(format!("simulated transport failure after {} frames", limit).into());
            }
        }

        self.pace();
        self.sequence += 1;
        let timestamp = Timestamp::from_duration(self.epoch.elapsed());

        let poses = self
            .bodies
            .iter()
            .map(|b| Pose::new(b.name.clone(), b.position, b.rotation, timestamp));
        let latency = self.latency.map(|s| Latency::new(Self::ID, s));

        Ok(Frame::builder(self.sequence)
            .rigid_bodies(poses)
            .point_cloud(self.markers.clone())
            .latency(latency)
            .timestamp(timestamp)
            .build())
    }
}

fn invalid(cfg: &Config, key: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: cfg.get(key).unwrap_or_default().to_string(),
        reason: reason.to_string(),
    }
}

fn parse_floats(raw: &str) -> Result<Vec<f32>, String> {
    raw.split(',')
        .map(|v| {
            v.trim()
                .parse::<f32>()
                .map_err(|e| format!("'{}': {}", v.trim(), e))
        })
        .collect()
}

fn parse_rigid_bodies(raw: &str) -> Result<Vec<MockBody>, String> {
    let mut bodies = Vec::new();
    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, rest) = entry
            .split_once('(')
            .ok_or_else(|| format!("expected name(x,y,z) in '{}'", entry))?;
        let args = rest
            .strip_suffix(')')
            .ok_or_else(|| format!("missing ')' in '{}'", entry))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("empty rigid body name in '{}'", entry));
        }

        let v = parse_floats(args)?;
        let rotation = match v.len() {
            3 => Quaternion::IDENTITY,
            7 => Quaternion::new(v[3], v[4], v[5], v[6]),
            n => return Err(format!("expected 3 or 7 values for '{}', got {}", name, n)),
        };
        if bodies.iter().any(|b: &MockBody| b.name == name) {
            return Err(format!("duplicate rigid body '{}'", name));
        }
        bodies.push(MockBody {
            name: name.to_string(),
            position: [v[0], v[1], v[2]],
            rotation,
        });
    }
    Ok(bodies)
}

fn parse_markers(raw: &str) -> Result<PointCloud, String> {
    raw.split(';')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|row| match parse_floats(row)?.as_slice() {
            &[x, y, z] => Ok([x, y, z]),
            other => Err(format!("expected x,y,z, got {} values in '{}'", other.len(), row)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rigid_bodies() {
        let bodies = parse_rigid_bodies("robot1(1,2,3); cf2(0, 0, 1, 0.7, 0.7, 0, 0)").unwrap();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0].name, "robot1");
        assert_eq!(bodies[0].position, [1.0, 2.0, 3.0]);
        assert_eq!(bodies[0].rotation, Quaternion::IDENTITY);
        assert_eq!(bodies[1].rotation, Quaternion::new(0.7, 0.7, 0.0, 0.0));

        assert!(parse_rigid_bodies("robot1(1,2)").is_err());
        assert!(parse_rigid_bodies("robot1 1,2,3").is_err());
        assert!(parse_rigid_bodies("(1,2,3)").is_err());
        assert!(parse_rigid_bodies("a(1,2,3);a(4,5,6)").is_err());
        assert!(parse_rigid_bodies("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_markers() {
        let cloud = parse_markers("0,0,1; 0.5,0.5,1;").unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.row(1), Some([0.5, 0.5, 1.0]));
        assert!(parse_markers("1,2").is_err());
        assert!(parse_markers("1,2,x").is_err());
    }

    #[test]
    fn test_from_config_rejects_bad_values() {
        assert!(MockBackend::from_config(&Config::new().with("rate", "abc")).is_err());
        assert!(MockBackend::from_config(&Config::new().with("rate", "-1")).is_err());
        assert!(MockBackend::from_config(&Config::new().with("rate", "inf")).is_err());
        assert!(MockBackend::from_config(&Config::new().with("latency", "-0.1")).is_err());
        assert!(MockBackend::from_config(&Config::new().with("fail_after", "x")).is_err());
        assert!(MockBackend::from_config(&Config::new().with("markers", "1;2;3")).is_err());
    }

    #[test]
    fn test_frames_carry_scene() {
        let cfg = Config::new()
            .with("rate", "0")
            .with("rigid_bodies", "robot1(1,2,3)")
            .with("markers", "0,0,1")
            .with("latency", "0.25");
        let mut backend = MockBackend::from_config(&cfg).unwrap();

        let frame = backend.next_frame().unwrap();
        assert_eq!(frame.sequence(), 1);
        assert_eq!(frame.capabilities(), MockBackend::CAPABILITIES);
        let pose = frame.rigid_body_by_name("robot1").unwrap();
        assert_eq!(pose.position(), [1.0, 2.0, 3.0]);
        assert_eq!(pose.timestamp(), frame.timestamp());
        assert_eq!(frame.point_cloud().len(), 1);
        assert_eq!(frame.latency().len(), 1);
        assert_eq!(frame.latency()[0].name(), "mock");
        assert!((frame.latency()[0].value() - 0.25).abs() < 1e-12);

        let next = backend.next_frame().unwrap();
        assert_eq!(next.sequence(), 2);
        assert!(next.timestamp() >= frame.timestamp());
    }

    #[test]
    fn test_empty_scene_is_present_but_empty() {
        let mut backend = MockBackend::new();
        let frame = backend.next_frame().unwrap();
        assert!(frame.capabilities().rigid_body_tracking());
        assert!(frame.rigid_bodies().is_empty());
        assert!(frame.latency().is_empty());
        assert!(frame.point_cloud().is_empty());
    }

    #[test]
    fn test_pacing() {
        let mut backend = MockBackend::new().with_rate(200.0).unwrap();
        let start = Instant::now();
        for _ in 0..5 {
            backend.next_frame().unwrap();
        }
        // First frame is immediate, the next four wait one 5 ms period each.
        assert!(start.elapsed() >= Duration::from_millis(19));
    }

    #[test]
    fn test_rate_with_unrepresentable_period() {
        for rate in [1e-20, 5e-324] {
            match MockBackend::new().with_rate(rate) {
                Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "rate"),
                Err(e) => panic!("unexpected error for rate {}: {}", rate, e),
                Ok(_) => panic!("rate {} accepted", rate),
            }
        }
        assert!(MockBackend::new().with_rate(0.5).is_ok());
    }

    #[test]
    fn test_fail_after() {
        let mut backend = MockBackend::new().fail_after(2);
        assert!(backend.next_frame().is_ok());
        assert!(backend.next_frame().is_ok());
        let err = backend.next_frame().unwrap_err();
        assert!(err.to_string().contains("after 2 frames"));
    }
}
