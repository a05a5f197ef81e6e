//! SSAP endpoint names, without the `ssap://` prefix.

// Services
pub const GET_SERVICES: &str = "api/getServiceList";
pub const GET_SOFTWARE_INFO: &str = "com.webos.service.update/getCurrentSWInformation";

// Apps
pub const GET_APPS: &str = "com.webos.applicationManager/listLaunchPoints";
pub const GET_CURRENT_APP_INFO: &str = "com.webos.applicationManager/getForegroundAppInfo";
pub const LAUNCH: &str = "system.launcher/launch";
pub const LAUNCHER_CLOSE: &str = "system.launcher/close";

// Power
pub const POWER_OFF: &str = "system/turnOff";
pub const POWER_ON: &str = "system/turnOn";

// 3D
pub const SET_3D_ON: &str = "com.webos.service.tv.display/set3DOn";
pub const SET_3D_OFF: &str = "com.webos.service.tv.display/set3DOff";

// Inputs
pub const GET_INPUTS: &str = "tv/getExternalInputList";
pub const SET_INPUT: &str = "tv/switchInput";

// Audio
pub const GET_AUDIO_STATUS: &str = "audio/getStatus";
pub const SET_MUTE: &str = "audio/setMute";
pub const GET_VOLUME: &str = "audio/getVolume";
pub const SET_VOLUME: &str = "audio/setVolume";
pub const VOLUME_UP: &str = "audio/volumeUp";
pub const VOLUME_DOWN: &str = "audio/volumeDown";

// TV channels
pub const TV_CHANNEL_UP: &str = "tv/channelUp";
pub const TV_CHANNEL_DOWN: &str = "tv/channelDown";
pub const GET_TV_CHANNELS: &str = "tv/getChannelList";
pub const GET_CURRENT_CHANNEL: &str = "tv/getCurrentChannel";
pub const GET_CHANNEL_INFO: &str = "tv/getChannelProgramInfo";
pub const SET_CHANNEL: &str = "tv/openChannel";

// Media controls
pub const MEDIA_PLAY: &str = "media.controls/play";
pub const MEDIA_PAUSE: &str = "media.controls/pause";
pub const MEDIA_STOP: &str = "media.controls/stop";
pub const MEDIA_CLOSE: &str = "media.viewer/close";
pub const MEDIA_REWIND: &str = "media.controls/rewind";
pub const MEDIA_FAST_FORWARD: &str = "media.controls/fastForward";

// Keys
pub const SEND_ENTER: &str = "com.webos.service.ime/sendEnterKey";
pub const SEND_DELETE: &str = "com.webos.service.ime/deleteCharacters";

// Web
pub const OPEN: &str = "system.launcher/open";
pub const CLOSE_WEB_APP: &str = "webapp/closeWebApp";

// Notifications
pub const SHOW_MESSAGE: &str = "system.notifications/createToast";
