//! Embedded Assistant v1alpha2 messages
//!
//! Hand-maintained prost definitions for the subset of
//! `google.assistant.embedded.v1alpha2` this client exchanges.
//!
//! ```protobuf
//! service EmbeddedAssistant {
//!     rpc Assist(stream AssistRequest) returns (stream AssistResponse);
//! }
//! ```

/// gRPC method path for EmbeddedAssistant.Assist
pub const ASSIST_PATH: &str = "/google.assistant.embedded.v1alpha2.EmbeddedAssistant/Assist";

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AssistRequest {
    #[prost(oneof = "assist_request::Type", tags = "1, 2")]
    pub r#type: Option<assist_request::Type>,
}

pub mod assist_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Type {
        #[prost(message, tag = "1")]
        Config(super::AssistConfig),
        #[prost(bytes = "vec", tag = "2")]
        AudioIn(Vec<u8>),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AssistConfig {
    #[prost(message, optional, tag = "2")]
    pub audio_out_config: Option<AudioOutConfig>,
    #[prost(message, optional, tag = "8")]
    pub screen_out_config: Option<ScreenOutConfig>,
    #[prost(message, optional, tag = "3")]
    pub dialog_state_in: Option<DialogStateIn>,
    #[prost(message, optional, tag = "4")]
    pub device_config: Option<DeviceConfig>,
    #[prost(message, optional, tag = "5")]
    pub debug_config: Option<DebugConfig>,
    #[prost(oneof = "assist_config::Type", tags = "1, 6")]
    pub r#type: Option<assist_config::Type>,
}

pub mod assist_config {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Type {
        #[prost(message, tag = "1")]
        AudioInConfig(super::AudioInConfig),
        #[prost(string, tag = "6")]
        TextQuery(String),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AudioInConfig {
    #[prost(enumeration = "audio_in_config::Encoding", tag = "1")]
    pub encoding: i32,
    #[prost(int32, tag = "2")]
    pub sample_rate_hertz: i32,
}

pub mod audio_in_config {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Encoding {
        Unspecified = 0,
        Linear16 = 1,
        Flac = 2,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AudioOutConfig {
    #[prost(enumeration = "audio_out_config::Encoding", tag = "1")]
    pub encoding: i32,
    #[prost(int32, tag = "2")]
    pub sample_rate_hertz: i32,
    #[prost(int32, tag = "3")]
    pub volume_percentage: i32,
}

pub mod audio_out_config {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Encoding {
        Unspecified = 0,
        Linear16 = 1,
        Mp3 = 2,
        OpusInOgg = 3,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScreenOutConfig {
    #[prost(enumeration = "screen_out_config::ScreenMode", tag = "1")]
    pub screen_mode: i32,
}

pub mod screen_out_config {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum ScreenMode {
        Unspecified = 0,
        Off = 1,
        Playing = 3,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DialogStateIn {
    #[prost(bytes = "vec", tag = "1")]
    pub conversation_state: Vec<u8>,
    #[prost(string, tag = "2")]
    pub language_code: String,
    #[prost(bool, tag = "7")]
    pub is_new_conversation: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeviceConfig {
    #[prost(string, tag = "1")]
    pub device_id: String,
    #[prost(string, tag = "3")]
    pub device_model_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DebugConfig {
    #[prost(bool, tag = "6")]
    pub return_debug_info: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AssistResponse {
    #[prost(enumeration = "assist_response::EventType", tag = "1")]
    pub event_type: i32,
    #[prost(message, optional, tag = "3")]
    pub audio_out: Option<AudioOut>,
    #[prost(message, optional, tag = "4")]
    pub screen_out: Option<ScreenOut>,
    #[prost(message, repeated, tag = "2")]
    pub speech_results: Vec<SpeechRecognitionResult>,
    #[prost(message, optional, tag = "5")]
    pub dialog_state_out: Option<DialogStateOut>,
    #[prost(message, optional, tag = "8")]
    pub debug_info: Option<DebugInfo>,
}

pub mod assist_response {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum EventType {
        Unspecified = 0,
        EndOfUtterance = 1,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AudioOut {
    #[prost(bytes = "vec", tag = "1")]
    pub audio_data: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScreenOut {
    #[prost(enumeration = "screen_out::Format", tag = "1")]
    pub format: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}

pub mod screen_out {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Format {
        Unspecified = 0,
        Html = 1,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpeechRecognitionResult {
    #[prost(string, tag = "1")]
    pub transcript: String,
    #[prost(float, tag = "2")]
    pub stability: f32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DialogStateOut {
    #[prost(string, tag = "1")]
    pub supplemental_display_text: String,
    #[prost(bytes = "vec", tag = "2")]
    pub conversation_state: Vec<u8>,
    #[prost(enumeration = "dialog_state_out::MicrophoneMode", tag = "3")]
    pub microphone_mode: i32,
    #[prost(int32, tag = "4")]
    pub volume_percentage: i32,
}

pub mod dialog_state_out {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum MicrophoneMode {
        Unspecified = 0,
        CloseMicrophone = 1,
        DialogFollowOn = 2,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DebugInfo {
    #[prost(string, tag = "1")]
    pub aog_agent_to_assistant_json: String,
}
