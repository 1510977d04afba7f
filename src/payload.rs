//! Vehicle data payload and its 4-byte wire layout.
//!
//! The layout is `[gear, type, value, speed]`, one unsigned byte each, with no
//! header and no length prefix.

use std::fmt;

/// Encoded payload length in bytes
pub const PAYLOAD_LEN: usize = 4;

/// `type` cycles through `0..TYPE_CYCLE`
pub const TYPE_CYCLE: u8 = 4;

/// One vehicle data sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationPayload {
    pub gear: u8,
    pub kind: u8,
    pub value: u8,
    pub speed: u8,
}

impl NotificationPayload {
    /// First sample sent after the service is offered
    pub const INITIAL: Self = Self {
        gear: 12,
        kind: 1,
        value: 12,
        speed: 60,
    };

    pub fn encode(&self) -> [u8; PAYLOAD_LEN] {
        [self.gear, self.kind, self.value, self.speed]
    }

    /// Decode exactly [`PAYLOAD_LEN`] bytes; any other length is rejected.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        match *bytes {
            [gear, kind, value, speed] => Some(Self {
                gear,
                kind,
                value,
                speed,
            }),
            _ => None,
        }
    }

    /// Step every field by one. `gear`, `value` and `speed` wrap at 256,
    /// `type` restarts at 0 once it reaches [`TYPE_CYCLE`].
    pub fn advance(&mut self) {
        self.gear = self.gear.wrapping_add(1);
        self.kind = self.kind.wrapping_add(1);
        self.value = self.value.wrapping_add(1);
        self.speed = self.speed.wrapping_add(1);

        if self.kind >= TYPE_CYCLE {
            self.kind = 0;
        }
    }
}

impl Default for NotificationPayload {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl From<NotificationPayload> for [u8; PAYLOAD_LEN] {
    fn from(payload: NotificationPayload) -> Self {
        payload.encode()
    }
}

impl fmt::Display for NotificationPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gear={} type={} value={} speed={}",
            self.gear, self.kind, self.value, self.speed
        )
    }
}

/// Transport-side payload buffer handed to `notify`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    data: Vec<u8>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffer contents with a copy of `data`
    pub fn set_data(&mut self, data: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(data);
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
