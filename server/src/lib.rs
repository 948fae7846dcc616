pub mod audio;
pub mod http;
pub mod tts;
