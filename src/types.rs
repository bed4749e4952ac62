use std::time::Duration;

/// Frame or pose capture time, stored in microseconds.
///
/// Backends report time in whatever unit their SDK uses; they convert at the
/// boundary with `from_micros` / `from_nanos` so the unit is never ambiguous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Value reported when a backend has no timestamp.
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_micros(us: u64) -> Self {
        Timestamp(us)
    }

    /// Truncates to whole microseconds.
    pub const fn from_nanos(ns: u64) -> Self {
        Timestamp(ns / 1_000)
    }

    /// Saturates at `u64::MAX` microseconds.
    pub fn from_duration(d: Duration) -> Self {
        Timestamp(u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
    }

    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// Saturates at `u64::MAX` nanoseconds.
    pub const fn as_nanos(self) -> u64 {
        self.0.saturating_mul(1_000)
    }

    pub const fn as_duration(self) -> Duration {
        Duration::from_micros(self.0)
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// Rotation quaternion. Not normalized on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion::new(1.0, 0.0, 0.0, 0.0);

    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    pub fn norm(&self) -> f32 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit-length copy, or identity for a zero quaternion.
    pub fn normalized(&self) -> Quaternion {
        let n = self.norm();
        if n <= f32::EPSILON {
            return Quaternion::IDENTITY;
        }
        Quaternion::new(self.w / n, self.x / n, self.y / n, self.z / n)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::IDENTITY
    }
}

/// Named rigid-body pose decoded from one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    name: String,
    position: [f32; 3],
    rotation: Quaternion,
    timestamp: Timestamp,
}

impl Pose {
    pub fn new(
        name: impl Into<String>,
        position: [f32; 3],
        rotation: Quaternion,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            name: name.into(),
            position,
            rotation,
            timestamp,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position [x, y, z] in backend units.
    pub fn position(&self) -> [f32; 3] {
        self.position
    }

    pub fn rotation(&self) -> Quaternion {
        self.rotation
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// Latency of one pipeline stage (acquisition, network transit, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Latency {
    name: String,
    value: f64,
}

impl Latency {
    pub fn new(name: impl Into<String>, seconds: f64) -> Self {
        Self {
            name: name.into(),
            value: seconds,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Latency in seconds.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// `None` for negative or non-finite values.
    pub fn as_duration(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.value).ok()
    }
}

/// Unlabeled marker positions for one frame, N rows of [x, y, z].
///
/// Rows are stored densely in row-major order. A row index means nothing
/// outside the frame it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    rows: Vec<[f32; 3]>,
}

impl PointCloud {
    pub const fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn from_rows(rows: Vec<[f32; 3]>) -> Self {
        Self { rows }
    }

    /// Build from a flat `[x0, y0, z0, x1, ...]` buffer.
    /// Returns `None` if the length is not a multiple of 3.
    pub fn from_flat(flat: &[f32]) -> Option<Self> {
        if flat.len() % 3 != 0 {
            return None;
        }
        let rows = flat
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Some(Self { rows })
    }

    /// Number of rows (markers).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<[f32; 3]> {
        self.rows.get(index).copied()
    }

    pub fn rows(&self) -> &[[f32; 3]] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f32; 3]> {
        self.rows.iter()
    }

    /// Row-major view with 3 floats per row.
    pub fn as_flat(&self) -> &[f32] {
        self.rows.as_flattened()
    }
}

impl FromIterator<[f32; 3]> for PointCloud {
    fn from_iter<I: IntoIterator<Item = [f32; 3]>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
