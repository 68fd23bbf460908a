//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for mmchat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one JSON file per chat session
    #[serde(default = "default_chat_history_path")]
    pub chat_history_path: String,
    /// Hosted model configuration
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// PDF ingestion settings
    #[serde(default)]
    pub pdf: PdfConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_chat_history_path() -> String {
    "chat_sessions/".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chat_history_path: default_chat_history_path(),
            providers: ProvidersConfig::default(),
            pdf: PdfConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// Hosted model endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub chat: ChatProviderConfig,
    #[serde(default)]
    pub vision: VisionProviderConfig,
    #[serde(default)]
    pub transcription: TranscriptionProviderConfig,
}

/// OpenAI-compatible chat completion endpoint used by both chains
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatProviderConfig {
    #[serde(default = "default_openai_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for ChatProviderConfig {
    fn default() -> Self {
        Self {
            api_base: default_openai_base(),
            api_key: String::new(),
            model: default_chat_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Vision-capable chat endpoint used for image questions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionProviderConfig {
    #[serde(default = "default_openai_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_vision_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_vision_model() -> String {
    "gpt-4o".to_string()
}

impl Default for VisionProviderConfig {
    fn default() -> Self {
        Self {
            api_base: default_openai_base(),
            api_key: String::new(),
            model: default_vision_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Whisper-compatible transcription endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionProviderConfig {
    #[serde(default = "default_transcription_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_transcription_model")]
    pub model: String,
}

fn default_transcription_url() -> String {
    "https://api.groq.com/openai/v1/audio/transcriptions".to_string()
}

fn default_transcription_model() -> String {
    "whisper-large-v3".to_string()
}

impl Default for TranscriptionProviderConfig {
    fn default() -> Self {
        Self {
            api_url: default_transcription_url(),
            api_key: String::new(),
            model: default_transcription_model(),
        }
    }
}

/// PDF ingestion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Directory where extracted chunks are kept
    #[serde(default = "default_pdf_index_path")]
    pub index_path: String,
    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Chunks handed to the pdf chain per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_pdf_index_path() -> String {
    "pdf_index/".to_string()
}

fn default_chunk_size() -> usize {
    1024
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_top_k() -> usize {
    3
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            index_path: default_pdf_index_path(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8501
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
