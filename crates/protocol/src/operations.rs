//! The operation table.
//!
//! Every remote-control operation is one row: an endpoint, the message kind
//! to send, and how to read the result out of the reply. The client runs all
//! of them through a single request-and-project path.

use serde_json::{Map, Value};

use crate::endpoints as ep;
use crate::messages::{MessageKind, ResponseEnvelope};

/// Value returned when a reply is missing or lacks the projected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// `{}`
    EmptyMap,
    /// `0`
    Zero,
    /// `null`
    Absent,
}

impl Fallback {
    /// The JSON value this fallback stands for.
    pub fn value(&self) -> Value {
        match self {
            Fallback::EmptyMap => Value::Object(Map::new()),
            Fallback::Zero => Value::from(0),
            Fallback::Absent => Value::Null,
        }
    }
}

/// What to extract from the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Nothing; the operation returns `null`.
    None,
    /// The whole `payload`.
    Payload(Fallback),
    /// One field of `payload`.
    Field(&'static str, Fallback),
}

/// How a caller-supplied payload is adjusted before it is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadRule {
    /// Sent as given.
    Verbatim,
    /// The named numeric field is raised to 0 if negative.
    NonNegative(&'static str),
}

impl PayloadRule {
    /// Applies the rule to a payload.
    pub fn apply(&self, payload: Option<Value>) -> Option<Value> {
        match self {
            PayloadRule::Verbatim => payload,
            PayloadRule::NonNegative(field) => payload.map(|mut payload| {
                if let Some(value) = payload.get_mut(*field) {
                    if value.as_f64().is_some_and(|n| n < 0.0) {
                        *value = Value::from(0);
                    }
                }
                payload
            }),
        }
    }
}

/// One row of the operation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    /// Stable operation name (used by the CLI's generic `call`).
    pub name: &'static str,
    /// Endpoint without the scheme.
    pub endpoint: &'static str,
    /// Kind of the envelope sent for this operation.
    pub kind: MessageKind,
    /// How the result is read from `last_response`.
    pub projection: Projection,
    /// How the outgoing payload is normalised.
    pub payload: PayloadRule,
}

impl Operation {
    const fn button(name: &'static str, endpoint: &'static str) -> Self {
        Self {
            name,
            endpoint,
            kind: MessageKind::Button,
            projection: Projection::None,
            payload: PayloadRule::Verbatim,
        }
    }

    const fn command(name: &'static str, endpoint: &'static str) -> Self {
        Self {
            name,
            endpoint,
            kind: MessageKind::Request,
            projection: Projection::None,
            payload: PayloadRule::Verbatim,
        }
    }

    const fn with_payload_rule(mut self, rule: PayloadRule) -> Self {
        self.payload = rule;
        self
    }

    const fn query(name: &'static str, endpoint: &'static str, projection: Projection) -> Self {
        Self {
            name,
            endpoint,
            kind: MessageKind::Request,
            projection,
            payload: PayloadRule::Verbatim,
        }
    }

    /// Normalises a caller-supplied payload for this operation.
    pub fn build_payload(&self, payload: Option<Value>) -> Option<Value> {
        self.payload.apply(payload)
    }

    /// Extracts this operation's result from a reply.
    pub fn project(&self, response: Option<&ResponseEnvelope>) -> Value {
        project(self.projection, response)
    }
}

/// Applies a projection, substituting the fallback for missing data.
pub fn project(projection: Projection, response: Option<&ResponseEnvelope>) -> Value {
    let payload = response.and_then(|r| r.payload.as_ref());

    match projection {
        Projection::None => Value::Null,
        Projection::Payload(fallback) => payload.cloned().unwrap_or_else(|| fallback.value()),
        Projection::Field(name, fallback) => payload
            .and_then(|p| p.get(name))
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| fallback.value()),
    }
}

// Power
pub const POWER_OFF: Operation = Operation::button("power_off", ep::POWER_OFF);
pub const POWER_ON: Operation = Operation::button("power_on", ep::POWER_ON);

// Services
pub const GET_SERVICES: Operation = Operation::query(
    "get_services",
    ep::GET_SERVICES,
    Projection::Field("services", Fallback::EmptyMap),
);
pub const GET_SOFTWARE_INFO: Operation = Operation::query(
    "get_software_info",
    ep::GET_SOFTWARE_INFO,
    Projection::Payload(Fallback::EmptyMap),
);

// Apps
pub const GET_APPS: Operation = Operation::query(
    "get_apps",
    ep::GET_APPS,
    Projection::Field("launchPoints", Fallback::EmptyMap),
);
pub const GET_CURRENT_APP: Operation = Operation::query(
    "get_current_app",
    ep::GET_CURRENT_APP_INFO,
    Projection::Field("appId", Fallback::Absent),
);
pub const LAUNCH_APP: Operation = Operation::command("launch_app", ep::LAUNCH);
pub const CLOSE_APP: Operation = Operation::command("close_app", ep::LAUNCHER_CLOSE);

// 3D
pub const TURN_3D_ON: Operation = Operation::command("turn_3d_on", ep::SET_3D_ON);
pub const TURN_3D_OFF: Operation = Operation::command("turn_3d_off", ep::SET_3D_OFF);

// Inputs
pub const GET_INPUTS: Operation = Operation::query(
    "get_inputs",
    ep::GET_INPUTS,
    Projection::Field("devices", Fallback::EmptyMap),
);
pub const SET_INPUT: Operation = Operation::command("set_input", ep::SET_INPUT);

// Audio
pub const GET_AUDIO_STATUS: Operation = Operation::query(
    "get_audio_status",
    ep::GET_AUDIO_STATUS,
    Projection::Payload(Fallback::EmptyMap),
);
pub const GET_MUTED: Operation = Operation::query(
    "get_muted",
    ep::GET_AUDIO_STATUS,
    Projection::Field("mute", Fallback::Absent),
);
pub const SET_MUTE: Operation = Operation::command("set_mute", ep::SET_MUTE);
pub const GET_VOLUME: Operation = Operation::query(
    "get_volume",
    ep::GET_VOLUME,
    Projection::Field("volume", Fallback::Zero),
);
pub const SET_VOLUME: Operation = Operation::command("set_volume", ep::SET_VOLUME)
    .with_payload_rule(PayloadRule::NonNegative("volume"));
pub const VOLUME_UP: Operation = Operation::button("volume_up", ep::VOLUME_UP);
pub const VOLUME_DOWN: Operation = Operation::button("volume_down", ep::VOLUME_DOWN);

// TV channels
pub const CHANNEL_UP: Operation = Operation::button("channel_up", ep::TV_CHANNEL_UP);
pub const CHANNEL_DOWN: Operation = Operation::button("channel_down", ep::TV_CHANNEL_DOWN);
pub const GET_CHANNELS: Operation = Operation::query(
    "get_channels",
    ep::GET_TV_CHANNELS,
    Projection::Field("channelList", Fallback::EmptyMap),
);
pub const GET_CURRENT_CHANNEL: Operation = Operation::query(
    "get_current_channel",
    ep::GET_CURRENT_CHANNEL,
    Projection::Payload(Fallback::EmptyMap),
);
pub const GET_CHANNEL_INFO: Operation = Operation::query(
    "get_channel_info",
    ep::GET_CHANNEL_INFO,
    Projection::Payload(Fallback::EmptyMap),
);
pub const SET_CHANNEL: Operation = Operation::command("set_channel", ep::SET_CHANNEL);

// Media controls
pub const PLAY: Operation = Operation::button("play", ep::MEDIA_PLAY);
pub const PAUSE: Operation = Operation::button("pause", ep::MEDIA_PAUSE);
pub const STOP: Operation = Operation::button("stop", ep::MEDIA_STOP);
pub const CLOSE_MEDIA: Operation = Operation::command("close", ep::MEDIA_CLOSE);
pub const REWIND: Operation = Operation::button("rewind", ep::MEDIA_REWIND);
pub const FAST_FORWARD: Operation = Operation::button("fast_forward", ep::MEDIA_FAST_FORWARD);

// Keys
pub const SEND_ENTER_KEY: Operation = Operation::button("send_enter_key", ep::SEND_ENTER);
pub const SEND_DELETE_KEY: Operation = Operation::button("send_delete_key", ep::SEND_DELETE);

// Web
pub const OPEN_URL: Operation = Operation::command("open_url", ep::OPEN);
pub const CLOSE_WEB: Operation = Operation::command("close_web", ep::CLOSE_WEB_APP);

// Notifications
pub const SEND_MESSAGE: Operation = Operation::command("send_message", ep::SHOW_MESSAGE);

/// Every operation, in catalog order.
pub const OPERATIONS: &[Operation] = &[
    POWER_OFF,
    POWER_ON,
    GET_SERVICES,
    GET_SOFTWARE_INFO,
    GET_APPS,
    GET_CURRENT_APP,
    LAUNCH_APP,
    CLOSE_APP,
    TURN_3D_ON,
    TURN_3D_OFF,
    GET_INPUTS,
    SET_INPUT,
    GET_AUDIO_STATUS,
    GET_MUTED,
    SET_MUTE,
    GET_VOLUME,
    SET_VOLUME,
    VOLUME_UP,
    VOLUME_DOWN,
    CHANNEL_UP,
    CHANNEL_DOWN,
    GET_CHANNELS,
    GET_CURRENT_CHANNEL,
    GET_CHANNEL_INFO,
    SET_CHANNEL,
    PLAY,
    PAUSE,
    STOP,
    CLOSE_MEDIA,
    REWIND,
    FAST_FORWARD,
    SEND_ENTER_KEY,
    SEND_DELETE_KEY,
    OPEN_URL,
    CLOSE_WEB,
    SEND_MESSAGE,
];

/// Looks up an operation by name.
pub fn find(name: &str) -> Option<&'static Operation> {
    OPERATIONS.iter().find(|op| op.name == name)
}
