//! Step-action cameras driven through a parameterized `ptz.cgi` endpoint.
//!
//! Every direction is its own request, e.g.
//! `/cgi-bin/ptz.cgi?action=start&channel=1&code=Left&arg1=0&arg2=3&arg3=0`,
//! and motion continues until the matching `action=stop` request.

use super::{excerpt, http_client, CommandBackend};
use crate::{
    command::{AxisSelector, MotionVector, Speed},
    config::CameraTarget,
};
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use digest_auth::{AuthContext, WwwAuthenticateHeader};
use reqwest::{
    blocking::{Client, Response},
    header::{AUTHORIZATION, WWW_AUTHENTICATE},
    StatusCode, Url,
};
use std::time::Duration;
use tracing::debug;

const PTZ_PATH: &str = "/cgi-bin/ptz.cgi";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Pan,
    Tilt,
    Zoom,
}

impl Group {
    fn of(axis: AxisSelector) -> &'static [Group] {
        match axis {
            AxisSelector::Pan => &[Group::Pan],
            AxisSelector::Tilt => &[Group::Tilt],
            AxisSelector::Zoom => &[Group::Zoom],
            AxisSelector::PanTilt => &[Group::Pan, Group::Tilt],
        }
    }

    fn speed(self, vector: &MotionVector) -> Speed {
        match self {
            Group::Pan => vector.pan,
            Group::Tilt => vector.tilt,
            Group::Zoom => vector.zoom,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Direction codes understood by the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Code {
    Up,
    Down,
    Left,
    Right,
    ZoomWide,
    ZoomTele,
}

impl Code {
    fn for_speed(group: Group, speed: Speed) -> Self {
        let positive = speed.velocity > 0.0;

        match group {
            Group::Pan if positive => Code::Right,
            Group::Pan => Code::Left,
            Group::Tilt if positive => Code::Down,
            Group::Tilt => Code::Up,
            Group::Zoom if positive => Code::ZoomTele,
            Group::Zoom => Code::ZoomWide,
        }
    }

    /// Code used to stop a group when nothing was started on it.
    fn default_for(group: Group) -> Self {
        match group {
            Group::Pan => Code::Left,
            Group::Tilt => Code::Up,
            Group::Zoom => Code::ZoomWide,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Code::Up => "Up",
            Code::Down => "Down",
            Code::Left => "Left",
            Code::Right => "Right",
            Code::ZoomWide => "ZoomWide",
            Code::ZoomTele => "ZoomTele",
        }
    }
}

pub struct StepBackend {
    client: Client,
    base_url: Url,
    channel: u32,
    username: String,
    password: String,
    /// Last digest challenge received from the camera, reused until it is
    /// rejected.
    challenge: Option<WwwAuthenticateHeader>,
    /// Code last started for each group, indexed by `Group`.
    active: [Option<Code>; 3],
}

impl StepBackend {
    pub fn new(target: &CameraTarget, request_timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(target.url())
            .wrap_err_with(|| format!("invalid camera url {}", target.url()))?;
        let (username, password) = target.credentials();

        Ok(Self {
            client: http_client(request_timeout)?,
            base_url,
            channel: target.channel(),
            username: username.to_string(),
            password: password.to_string(),
            challenge: None,
            active: [None; 3],
        })
    }

    fn request_url(&self, action: &str, code: Code, speed: u8) -> Result<Url> {
        let mut url = self
            .base_url
            .join(PTZ_PATH)
            .wrap_err("failed to build ptz url")?;

        url.query_pairs_mut()
            .append_pair("action", action)
            .append_pair("channel", &self.channel.to_string())
            .append_pair("code", code.as_str())
            .append_pair("arg1", "0")
            .append_pair("arg2", &speed.to_string())
            .append_pair("arg3", "0");

        Ok(url)
    }

    fn start(&mut self, group: Group, speed: Speed) -> Result<()> {
        let code = Code::for_speed(group, speed);
        self.send("start", code, speed.step)?;
        self.active[group.index()] = Some(code);
        Ok(())
    }

    fn stop_group(&mut self, group: Group) -> Result<()> {
        // Forget the running code only once the camera accepted the stop.
        let code = self.active[group.index()].unwrap_or_else(|| Code::default_for(group));
        self.send("stop", code, 0)?;
        self.active[group.index()] = None;
        Ok(())
    }

    fn send(&mut self, action: &str, code: Code, speed: u8) -> Result<()> {
        let url = self.request_url(action, code, speed)?;
        debug!(%url, "Sending ptz.cgi request");

        let mut response = self.get(&url)?;

        // The cached challenge may have expired; answer the new one once.
        if response.status() == StatusCode::UNAUTHORIZED {
            self.challenge = Some(parse_challenge(&response)?);
            response = self.get(&url)?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!(
                "ptz.cgi {action} {} failed with HTTP {status}: {}",
                code.as_str(),
                excerpt(&body)
            );
        }

        Ok(())
    }

    fn get(&mut self, url: &Url) -> Result<Response> {
        let mut request = self.client.get(url.clone());

        if let Some(challenge) = self.challenge.as_mut() {
            let context = AuthContext::new(
                self.username.as_str(),
                self.password.as_str(),
                request_uri(url),
            );
            let answer = challenge
                .respond(&context)
                .map_err(|e| eyre!("failed to answer digest challenge: {e}"))?;
            request = request.header(AUTHORIZATION, answer.to_header_string());
        }

        request
            .send()
            .wrap_err_with(|| format!("request to {} failed", url.host_str().unwrap_or("camera")))
    }
}

impl CommandBackend for StepBackend {
    fn continuous_move(
        &mut self,
        axis: AxisSelector,
        vector: MotionVector,
        _timeout: Duration,
    ) -> Result<()> {
        for &group in Group::of(axis) {
            let speed = group.speed(&vector);

            if speed.is_zero() {
                self.stop_group(group)?;
            } else {
                self.start(group, speed)?;
            }
        }

        Ok(())
    }

    fn stop(&mut self, axis: AxisSelector) -> Result<()> {
        for &group in Group::of(axis) {
            self.stop_group(group)?;
        }

        Ok(())
    }
}

fn parse_challenge(response: &Response) -> Result<WwwAuthenticateHeader> {
    let header = response
        .headers()
        .get(WWW_AUTHENTICATE)
        .ok_or_else(|| eyre!("camera rejected the request without a digest challenge"))?
        .to_str()
        .wrap_err("malformed WWW-Authenticate header")?;

    digest_auth::parse(header).map_err(|e| eyre!("unsupported authentication challenge: {e}"))
}

/// Path and query of a URL, as used in the digest `uri` field.
fn request_uri(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockCamera, Reply};

    fn backend(url: &str) -> StepBackend {
        StepBackend {
            client: Client::new(),
            base_url: Url::parse(url).unwrap(),
            channel: 1,
            username: "admin".to_string(),
            password: "secret".to_string(),
            challenge: None,
            active: [None; 3],
        }
    }

    #[test]
    fn builds_action_urls() {
        let backend = backend("http://10.0.0.6");
        let url = backend.request_url("start", Code::Left, 3).unwrap();

        assert_eq!(
            url.as_str(),
            "http://10.0.0.6/cgi-bin/ptz.cgi?action=start&channel=1&code=Left&arg1=0&arg2=3&arg3=0"
        );
        assert_eq!(
            request_uri(&url),
            "/cgi-bin/ptz.cgi?action=start&channel=1&code=Left&arg1=0&arg2=3&arg3=0"
        );
    }

    #[test]
    fn ignores_base_path() {
        let backend = backend("http://10.0.0.6:8080/some/path");
        let url = backend.request_url("stop", Code::ZoomTele, 0).unwrap();

        assert!(url
            .as_str()
            .starts_with("http://10.0.0.6:8080/cgi-bin/ptz.cgi?action=stop"));
    }

    #[test]
    fn codes_follow_velocity_sign() {
        let right = Speed::new(0.1, 1);
        let left = Speed::new(-0.1, 1);

        assert_eq!(Code::for_speed(Group::Pan, right), Code::Right);
        assert_eq!(Code::for_speed(Group::Pan, left), Code::Left);
        assert_eq!(Code::for_speed(Group::Tilt, right), Code::Down);
        assert_eq!(Code::for_speed(Group::Tilt, left), Code::Up);
        assert_eq!(Code::for_speed(Group::Zoom, right), Code::ZoomTele);
        assert_eq!(Code::for_speed(Group::Zoom, left), Code::ZoomWide);
    }

    fn request_line(request: &str) -> &str {
        request.lines().next().unwrap_or_default()
    }

    #[test]
    fn failed_stop_keeps_running_code() {
        let camera = MockCamera::start(vec![
            Reply::status(200),
            Reply::status(500),
            Reply::status(200),
            Reply::status(200),
        ]);
        let mut backend = backend(camera.url());

        let vector = MotionVector::pan_tilt(Speed::new(0.125, 3), Speed::ZERO);
        backend
            .continuous_move(AxisSelector::Pan, vector, Duration::from_secs(10))
            .unwrap();
        assert!(backend.stop(AxisSelector::Pan).is_err());
        backend.stop(AxisSelector::Pan).unwrap();
        backend.stop(AxisSelector::Pan).unwrap();

        let requests = camera.requests();
        assert_eq!(requests.len(), 4);
        assert!(request_line(&requests[0]).contains("action=start&channel=1&code=Right&arg1=0&arg2=3"));
        assert!(request_line(&requests[1]).contains("action=stop&channel=1&code=Right"));
        assert!(request_line(&requests[2]).contains("action=stop&channel=1&code=Right"));
        assert!(request_line(&requests[3]).contains("action=stop&channel=1&code=Left"));
    }

    #[test]
    fn stop_uses_code_of_each_group() {
        let camera = MockCamera::start((0..4).map(|_| Reply::status(200)).collect());
        let mut backend = backend(camera.url());

        let vector = MotionVector::pan_tilt(Speed::new(-0.2, 6), Speed::new(0.1, 2));
        backend
            .continuous_move(AxisSelector::PanTilt, vector, Duration::from_secs(10))
            .unwrap();
        backend.stop(AxisSelector::PanTilt).unwrap();

        let requests = camera.requests();
        assert!(request_line(&requests[0]).contains("action=start&channel=1&code=Left&arg1=0&arg2=6"));
        assert!(request_line(&requests[1]).contains("action=start&channel=1&code=Down&arg1=0&arg2=2"));
        assert!(request_line(&requests[2]).contains("action=stop&channel=1&code=Left"));
        assert!(request_line(&requests[3]).contains("action=stop&channel=1&code=Down"));
    }

    #[test]
    fn answers_digest_challenge_once_and_reuses_it() {
        let camera = MockCamera::start(vec![
            Reply::status(401).header(
                "WWW-Authenticate",
                r#"Digest realm="camera", qop="auth", nonce="5f1a2b3c""#,
            ),
            Reply::status(200),
            Reply::status(200),
        ]);
        let mut backend = backend(camera.url());

        backend.stop(AxisSelector::Zoom).unwrap();
        backend.stop(AxisSelector::Zoom).unwrap();

        let requests: Vec<String> = camera
            .requests()
            .iter()
            .map(|request| request.to_lowercase())
            .collect();
        assert_eq!(requests.len(), 3);
        assert!(!requests[0].contains("authorization:"));
        assert!(requests[1].contains("authorization: digest "));
        assert!(requests[1].contains("username=\"admin\""));
        assert!(requests[1].contains("realm=\"camera\""));
        assert!(requests[2].contains("authorization: digest "));
    }

    #[test]
    fn repeated_rejection_is_an_error() {
        let challenge = r#"Digest realm="camera", qop="auth", nonce="5f1a2b3c""#;
        let camera = MockCamera::start(vec![
            Reply::status(401).header("WWW-Authenticate", challenge),
            Reply::status(401).header("WWW-Authenticate", challenge),
        ]);
        let mut backend = backend(camera.url());

        let error = backend.stop(AxisSelector::Tilt).unwrap_err();
        assert!(format!("{error:#}").contains("401"));
        assert_eq!(camera.requests().len(), 2);
    }

    #[test]
    fn combined_selector_covers_both_groups() {
        assert_eq!(Group::of(AxisSelector::PanTilt), &[Group::Pan, Group::Tilt]);
        assert_eq!(Group::of(AxisSelector::Zoom), &[Group::Zoom]);
    }
}
