bitflags::bitflags! {
    /// Data a backend is able to produce. Fixed for the life of a session.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const RIGID_BODY_TRACKING = 1 << 0;
        const LATENCY_ESTIMATE    = 1 << 1;
        const POINT_CLOUD         = 1 << 2;
        const TIMESTAMP           = 1 << 3;
    }
}

impl Capabilities {
    pub fn rigid_body_tracking(self) -> bool {
        self.contains(Capabilities::RIGID_BODY_TRACKING)
    }

    pub fn latency_estimate(self) -> bool {
        self.contains(Capabilities::LATENCY_ESTIMATE)
    }

    pub fn point_cloud(self) -> bool {
        self.contains(Capabilities::POINT_CLOUD)
    }

    pub fn timestamp(self) -> bool {
        self.contains(Capabilities::TIMESTAMP)
    }
}
