use crate::{backend::Backend, config::CameraTarget};
use color_eyre::eyre::{bail, Result};
use std::time::Duration;
use tracing::warn;

/// A camera that can be steered.
pub struct Camera<B> {
    name: String,
    backend: B,
}

impl<B> Camera<B> {
    pub fn new(name: impl Into<String>, backend: B) -> Self {
        Self {
            name: name.into(),
            backend,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

/// The configured cameras, in order, and which of them is being steered.
pub struct CameraRoster<B> {
    cameras: Vec<Camera<B>>,
    active: usize,
}

impl<B> CameraRoster<B> {
    pub fn new(cameras: Vec<Camera<B>>) -> Result<Self> {
        if cameras.is_empty() {
            bail!("no cameras available");
        }

        Ok(Self { cameras, active: 0 })
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &Camera<B> {
        &self.cameras[self.active]
    }

    pub fn active_mut(&mut self) -> &mut Camera<B> {
        &mut self.cameras[self.active]
    }

    /// Make the next camera active, wrapping around after the last one.
    pub fn select_next(&mut self) -> usize {
        self.active = (self.active + 1) % self.cameras.len();
        self.active
    }
}

impl CameraRoster<Backend> {
    /// Connect to every configured camera. Cameras that cannot be reached are
    /// left out, and it is an error if none remain.
    pub fn connect(targets: &[CameraTarget], request_timeout: Duration) -> Result<Self> {
        let mut cameras = Vec::with_capacity(targets.len());

        for target in targets {
            match Backend::connect(target, request_timeout) {
                Ok(backend) => cameras.push(Camera::new(target.name(), backend)),
                Err(e) => warn!(camera = target.name(), "Skipping camera: {:#}", e),
            }
        }

        if cameras.is_empty() {
            bail!("none of the {} configured cameras could be reached", targets.len());
        }

        Self::new(cameras)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(count: usize) -> CameraRoster<()> {
        let cameras = (0..count)
            .map(|i| Camera::new(format!("camera-{i}"), ()))
            .collect();
        CameraRoster::new(cameras).unwrap()
    }

    #[test]
    fn starts_at_first_camera() {
        let roster = roster(3);
        assert_eq!(roster.active_index(), 0);
        assert_eq!(roster.active().name(), "camera-0");
    }

    #[test]
    fn wraps_after_last_camera() {
        let mut roster = roster(3);
        roster.select_next();
        roster.select_next();
        assert_eq!(roster.active_index(), 2);
        assert_eq!(roster.select_next(), 0);
    }

    #[test]
    fn full_cycle_returns_to_start() {
        for count in 1..=5 {
            let mut roster = roster(count);
            roster.select_next();
            let start = roster.active_index();

            for _ in 0..roster.len() {
                roster.select_next();
            }

            assert_eq!(roster.active_index(), start);
        }
    }

    #[test]
    fn single_camera_stays_selected() {
        let mut roster = roster(1);
        assert_eq!(roster.select_next(), 0);
        assert_eq!(roster.active().name(), "camera-0");
    }

    #[test]
    fn empty_roster_is_rejected() {
        assert!(CameraRoster::<()>::new(Vec::new()).is_err());
    }
}
