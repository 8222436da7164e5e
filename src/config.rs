// Process configuration, read once from the environment at startup.
//
// Providers wired into the request path at load time are required: the
// process refuses to start without their credentials. Providers wired
// lazily (OpenAI, Cloudinary, Supabase) are optional and degrade to a
// logged no-op or a call-time upstream error.

use std::env;
use std::fmt;

#[derive(Debug)]
pub struct ConfigError(String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} environment variable not set", self.0)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
}

#[derive(Clone)]
pub struct Config {
    pub d_id_api_key: String,
    pub fish_audio_api_key: String,
    pub hugging_face_api_key: String,
    pub cloudconvert_api_key: String,
    pub openai_api_key: Option<String>,
    pub cloudinary: Option<CloudinaryConfig>,
    pub supabase: Option<SupabaseConfig>,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let cloudinary = match (
            env::var("CLOUDINARY_CLOUD_NAME").ok(),
            env::var("CLOUDINARY_API_KEY").ok(),
            env::var("CLOUDINARY_API_SECRET").ok(),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        let supabase = match (env::var("SUPABASE_URL").ok(), env::var("SUPABASE_KEY").ok()) {
            (Some(url), Some(key)) => Some(SupabaseConfig { url, key }),
            _ => None,
        };

        Ok(Config {
            d_id_api_key: required("D_ID_API_KEY")?,
            fish_audio_api_key: required("FISH_AUDIO_API_KEY")?,
            hugging_face_api_key: required("HUGGING_FACE_API_KEY")?,
            cloudconvert_api_key: required("CLOUDCONVERT_API_KEY")?,
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            cloudinary,
            supabase,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError(name.to_string()))
}
