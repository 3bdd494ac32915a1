//! Continuous-motion cameras driven through the ONVIF PTZ service.

use super::{excerpt, http_client, wsse, CommandBackend};
use crate::{
    command::{AxisSelector, MotionVector, Speed},
    config::CameraTarget,
};
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use reqwest::blocking::Client;
use roxmltree::Document;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEVICE_NS: &str = "http://www.onvif.org/ver10/device/wsdl";
const MEDIA_NS: &str = "http://www.onvif.org/ver10/media/wsdl";
const PTZ_NS: &str = "http://www.onvif.org/ver20/ptz/wsdl";
const SCHEMA_NS: &str = "http://www.onvif.org/ver10/schema";

/// A service advertised by the device.
#[derive(Debug, Clone, PartialEq)]
struct Service {
    namespace: String,
    xaddr: String,
}

pub struct OnvifBackend {
    client: Client,
    username: String,
    password: String,
    ptz: Service,
    profile_token: String,
    /// Last pan/tilt velocity sent to the camera, in controller convention.
    pan_velocity: f32,
    tilt_velocity: f32,
    timeout: Duration,
}

impl OnvifBackend {
    /// Connect to the camera's device service, find its PTZ service and
    /// resolve the media profile to steer.
    pub fn connect(target: &CameraTarget, request_timeout: Duration) -> Result<Self> {
        let (username, password) = target.credentials();
        let mut backend = Self {
            client: http_client(request_timeout)?,
            username: username.to_string(),
            password: password.to_string(),
            ptz: Service {
                namespace: PTZ_NS.to_string(),
                xaddr: target.url().to_string(),
            },
            profile_token: String::new(),
            pan_velocity: 0.0,
            tilt_velocity: 0.0,
            timeout: Duration::ZERO,
        };

        let services = backend
            .call(
                target.url(),
                DEVICE_NS,
                "GetServices",
                "<GetServices xmlns=\"http://www.onvif.org/ver10/device/wsdl\"><IncludeCapability>false</IncludeCapability></GetServices>",
            )
            .wrap_err("failed to query device services")?;

        let media = find_service(&services, "/media/wsdl").unwrap_or_else(|| Service {
            namespace: MEDIA_NS.to_string(),
            xaddr: target.url().to_string(),
        });

        match find_service(&services, "/ptz/wsdl") {
            Some(ptz) => backend.ptz = ptz,
            None => warn!(
                camera = target.name(),
                "Device did not advertise a PTZ service, using the device service"
            ),
        }

        backend.profile_token = match target.profile_token() {
            Some(token) => token.to_string(),
            None => {
                let body = format!("<GetProfiles xmlns=\"{}\"/>", media.namespace);
                let profiles = backend
                    .call(&media.xaddr, &media.namespace, "GetProfiles", &body)
                    .wrap_err("failed to query media profiles")?;
                first_profile_token(&profiles)?
            }
        };

        info!(
            camera = target.name(),
            ptz = %backend.ptz.xaddr,
            profile = %backend.profile_token,
            "Connected to ONVIF camera"
        );

        Ok(backend)
    }

    fn continuous_move_body(&self, axis: AxisSelector, vector: MotionVector, timeout: Duration) -> String {
        let mut velocity = String::new();

        if axis.includes_pan() || axis.includes_tilt() {
            // ONVIF tilts up for positive values.
            velocity.push_str(&format!(
                "<PanTilt xmlns=\"{SCHEMA_NS}\" x=\"{}\" y=\"{}\"/>",
                format_velocity(vector.pan.velocity),
                format_velocity(-vector.tilt.velocity),
            ));
        }

        if axis.includes_zoom() {
            velocity.push_str(&format!(
                "<Zoom xmlns=\"{SCHEMA_NS}\" x=\"{}\"/>",
                format_velocity(vector.zoom.velocity),
            ));
        }

        format!(
            "<ContinuousMove xmlns=\"{ns}\"><ProfileToken>{token}</ProfileToken><Velocity>{velocity}</Velocity><Timeout>{timeout}</Timeout></ContinuousMove>",
            ns = self.ptz.namespace,
            token = wsse::escape(&self.profile_token),
            timeout = iso8601_duration(timeout),
        )
    }

    fn stop_body(&self, pan_tilt: bool, zoom: bool) -> String {
        format!(
            "<Stop xmlns=\"{ns}\"><ProfileToken>{token}</ProfileToken><PanTilt>{pan_tilt}</PanTilt><Zoom>{zoom}</Zoom></Stop>",
            ns = self.ptz.namespace,
            token = wsse::escape(&self.profile_token),
        )
    }

    /// Send a SOAP request and return the response body.
    fn call(&self, url: &str, namespace: &str, action: &str, body: &str) -> Result<String> {
        let envelope = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<s:Envelope xmlns:s=\"http://www.w3.org/2003/05/soap-envelope\">\n  {}\n  <s:Body>{}</s:Body>\n</s:Envelope>",
            wsse::security_header(&self.username, &self.password)?,
            body,
        );

        debug!(url, action, "Sending ONVIF request");

        let response = self
            .client
            .post(url)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("application/soap+xml; charset=utf-8; action=\"{namespace}/{action}\""),
            )
            .body(envelope)
            .send()
            .wrap_err_with(|| format!("{action} request to {url} failed"))?;

        let status = response.status();
        let body = response
            .text()
            .wrap_err_with(|| format!("unreadable {action} response from {url}"))?;

        if let Some(reason) = fault_reason(&body) {
            bail!("{action} failed with HTTP {status}: {reason}");
        }

        if !status.is_success() {
            bail!("{action} failed with HTTP {status}: {}", excerpt(&body));
        }

        debug!(url, action, body = excerpt(&body), "ONVIF response");
        Ok(body)
    }
}

impl CommandBackend for OnvifBackend {
    fn continuous_move(
        &mut self,
        axis: AxisSelector,
        vector: MotionVector,
        timeout: Duration,
    ) -> Result<()> {
        let body = self.continuous_move_body(axis, vector, timeout);
        self.call(&self.ptz.xaddr, &self.ptz.namespace, "ContinuousMove", &body)?;

        if axis.includes_pan() || axis.includes_tilt() {
            self.pan_velocity = vector.pan.velocity;
            self.tilt_velocity = vector.tilt.velocity;
            self.timeout = timeout;
        }

        Ok(())
    }

    fn stop(&mut self, axis: AxisSelector) -> Result<()> {
        if let Some(vector) = remaining_motion(axis, self.pan_velocity, self.tilt_velocity) {
            return self.continuous_move(AxisSelector::PanTilt, vector, self.timeout);
        }

        let pan_tilt = axis.includes_pan() || axis.includes_tilt();
        let body = self.stop_body(pan_tilt, axis.includes_zoom());
        self.call(&self.ptz.xaddr, &self.ptz.namespace, "Stop", &body)?;

        if pan_tilt {
            self.pan_velocity = 0.0;
            self.tilt_velocity = 0.0;
        }

        Ok(())
    }
}

/// Motion left over after stopping a single axis, or `None` when a plain
/// Stop will do.
///
/// A Stop request always halts pan and tilt together, so stopping one of them
/// while the other is moving has to re-send the other one on its own.
fn remaining_motion(axis: AxisSelector, pan_velocity: f32, tilt_velocity: f32) -> Option<MotionVector> {
    match axis {
        AxisSelector::Pan if tilt_velocity != 0.0 => {
            Some(MotionVector::pan_tilt(Speed::ZERO, Speed::new(tilt_velocity, 0)))
        }
        AxisSelector::Tilt if pan_velocity != 0.0 => {
            Some(MotionVector::pan_tilt(Speed::new(pan_velocity, 0), Speed::ZERO))
        }
        _ => None,
    }
}

fn find_service(body: &str, needle: &str) -> Option<Service> {
    let doc = Document::parse(body).ok()?;

    doc.descendants()
        .filter(|node| node.tag_name().name() == "Service")
        .find_map(|service| {
            let child_text = |name: &str| {
                service
                    .children()
                    .find(|node| node.tag_name().name() == name)
                    .and_then(|node| node.text())
                    .map(str::trim)
            };

            let namespace = child_text("Namespace")?;
            if !namespace.contains(needle) {
                return None;
            }

            let xaddr = child_text("XAddr")?.split_whitespace().next()?;
            Some(Service {
                namespace: namespace.to_string(),
                xaddr: xaddr.to_string(),
            })
        })
}

fn first_profile_token(body: &str) -> Result<String> {
    let doc = Document::parse(body).wrap_err("malformed GetProfiles response")?;

    doc.descendants()
        .find(|node| node.tag_name().name() == "Profiles")
        .and_then(|node| node.attribute("token"))
        .map(str::to_string)
        .ok_or_else(|| eyre!("camera reported no media profiles"))
}

/// Extract the reason text of a SOAP fault, if the body is one.
fn fault_reason(body: &str) -> Option<String> {
    let doc = Document::parse(body).ok()?;
    let fault = doc
        .descendants()
        .find(|node| node.tag_name().name() == "Fault")?;

    let reason = fault
        .descendants()
        .find(|node| matches!(node.tag_name().name(), "Text" | "faultstring"))
        .and_then(|node| node.text())
        .unwrap_or("SOAP fault");

    Some(reason.trim().to_string())
}

fn format_velocity(value: f32) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{value:.3}")
    }
}

/// Format a duration as an `xs:duration`, e.g. `PT10S` or `PT1.5S`.
fn iso8601_duration(duration: Duration) -> String {
    let millis = duration.subsec_millis();

    if millis == 0 {
        format!("PT{}S", duration.as_secs())
    } else {
        let fraction = format!("{millis:03}");
        format!("PT{}.{}S", duration.as_secs(), fraction.trim_end_matches('0'))
    }
}
