use color_eyre::eyre::{bail, Result, WrapErr};
use reqwest::Url;
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

/// Protocol spoken by a camera.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// ONVIF PTZ service, continuous moves over SOAP.
    #[default]
    Onvif,
    /// Parameterized `ptz.cgi` HTTP endpoint, one request per direction.
    Cgi,
}

/// One configured camera.
#[derive(Debug, Clone, Deserialize)]
pub struct CameraTarget {
    #[serde(default)]
    name: Option<String>,
    url: String,
    user: String,
    pass: String,
    #[serde(default)]
    protocol: Protocol,
    #[serde(default)]
    onvif_profile_token: Option<String>,
    #[serde(default = "default_channel")]
    channel: u32,
}

impl CameraTarget {
    /// Name used to identify the camera in logs.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn credentials(&self) -> (&str, &str) {
        (&self.user, &self.pass)
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn profile_token(&self) -> Option<&str> {
        self.onvif_profile_token.as_deref()
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub cameras: Vec<CameraTarget>,

    /// Upper bound for every request sent to a camera.
    #[serde(default = "default_request_timeout_ms")]
    request_timeout_ms: u64,

    /// How long a continuous move runs before the camera stops on its own.
    #[serde(default = "default_move_timeout_secs")]
    move_timeout_secs: u64,

    /// Stop the active camera before switching to the next one.
    #[serde(default)]
    pub stop_on_switch: bool,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).wrap_err_with(|| {
            format!(
                "could not read {}, expected a YAML file listing the cameras to control",
                path.display()
            )
        })?;

        Self::parse(&contents).wrap_err_with(|| format!("invalid configuration in {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self =
            serde_yaml_ng::from_str(contents).wrap_err("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn move_timeout(&self) -> Duration {
        Duration::from_secs(self.move_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.cameras.is_empty() {
            bail!("no cameras configured");
        }

        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be greater than zero");
        }

        if self.move_timeout_secs == 0 {
            bail!("move_timeout_secs must be greater than zero");
        }

        for camera in &self.cameras {
            let url = Url::parse(&camera.url)
                .wrap_err_with(|| format!("camera {} has an invalid url", camera.name()))?;

            if !matches!(url.scheme(), "http" | "https") {
                bail!("camera {} must use an http or https url", camera.name());
            }

            if camera.user.is_empty() {
                bail!("camera {} has no user", camera.name());
            }
        }

        Ok(())
    }
}

fn default_channel() -> u32 {
    1
}

fn default_request_timeout_ms() -> u64 {
    2000
}

fn default_move_timeout_secs() -> u64 {
    10
}
