use derivative::Derivative;
use glam::Vec3;
use log::{debug, info, trace};

use crate::{
    Atmosphere, Camera, Frustum, SunLighting, SunTracker, TransmittanceLutData,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AtmosphereHandle(usize);

#[derive(Derivative)]
#[derivative(Debug)]
struct AtmosphereEntry {
    handle: AtmosphereHandle,
    atmosphere: Atmosphere,

    /// Host-side copy of the transmittance lookup table; `None` until the
    /// table gets rendered and read back for the first time
    #[derivative(Debug = "ignore")]
    lut: Option<TransmittanceLutData>,

    lut_dirty: bool,
    sun_tracker: SunTracker,
}

/// All the atmospheres known to the engine, in insertion order.
#[derive(Debug, Default)]
pub struct Atmospheres {
    entries: Vec<AtmosphereEntry>,
    next_id: usize,
}

impl Atmospheres {
    pub fn add(&mut self, atmosphere: Atmosphere) -> AtmosphereHandle {
        let handle = AtmosphereHandle(self.next_id);

        info!("Adding atmosphere: {handle:?}");

        self.entries.push(AtmosphereEntry {
            handle,
            atmosphere: atmosphere.sanitized(),
            lut: None,
            lut_dirty: true,
            sun_tracker: Default::default(),
        });

        self.next_id += 1;

        handle
    }

    /// Replaces given atmosphere; the lookup table gets scheduled for
    /// rebuilding only if parameters affecting it have changed.
    pub fn update(&mut self, handle: AtmosphereHandle, atmosphere: Atmosphere) {
        let entry = self.entry_mut(handle);
        let atmosphere = atmosphere.sanitized();

        if entry.atmosphere.is_invalidated_by(&atmosphere) {
            debug!("Atmosphere {handle:?} invalidated; rebuilding its LUT");

            entry.lut_dirty = true;
        }

        entry.atmosphere = atmosphere;
    }

    pub fn remove(&mut self, handle: AtmosphereHandle) {
        info!("Removing atmosphere: {handle:?}");

        self.entries.retain(|entry| entry.handle != handle);
    }

    pub fn get(&self, handle: AtmosphereHandle) -> Option<&Atmosphere> {
        self.entries
            .iter()
            .find(|entry| entry.handle == handle)
            .map(|entry| &entry.atmosphere)
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (AtmosphereHandle, &Atmosphere)> + '_ {
        self.entries
            .iter()
            .map(|entry| (entry.handle, &entry.atmosphere))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns atmospheres whose lookup tables have to be rebuilt.
    pub fn dirty(&self) -> Vec<AtmosphereHandle> {
        self.entries
            .iter()
            .filter(|entry| entry.lut_dirty)
            .map(|entry| entry.handle)
            .collect()
    }

    /// Stores a freshly read-back lookup table.
    pub fn set_lut(
        &mut self,
        handle: AtmosphereHandle,
        lut: TransmittanceLutData,
    ) {
        let entry = self.entry_mut(handle);

        entry.lut = Some(lut);
        entry.lut_dirty = false;
    }

    pub fn lut(
        &self,
        handle: AtmosphereHandle,
    ) -> Option<&TransmittanceLutData> {
        self.entries
            .iter()
            .find(|entry| entry.handle == handle)
            .and_then(|entry| entry.lut.as_ref())
    }

    /// Returns the atmosphere a camera should render: the first one (in
    /// insertion order) that has a sun and that's inside the camera's
    /// frustum.
    ///
    /// Per-camera sky buffers can hold only a single atmosphere, so any
    /// other visible atmospheres get skipped.
    pub fn find_visible(
        &self,
        camera: &Camera,
    ) -> Option<(AtmosphereHandle, &Atmosphere)> {
        let frustum = Frustum::new(camera.view_projection());
        let mut found = None;

        for entry in &self.entries {
            if entry.atmosphere.sun.is_none() {
                trace!("Skipping atmosphere {:?}: no sun", entry.handle);
                continue;
            }

            if !frustum.intersects(&entry.atmosphere.bounds()) {
                trace!("Skipping atmosphere {:?}: culled", entry.handle);
                continue;
            }

            if found.is_some() {
                trace!(
                    "Skipping atmosphere {:?}: another one is already visible",
                    entry.handle
                );

                continue;
            }

            found = Some((entry.handle, &entry.atmosphere));
        }

        found
    }

    /// Returns the sunlight reaching given position; `None` if the
    /// atmosphere has no sun or its lookup table isn't ready yet.
    pub fn sun_lighting(
        &mut self,
        handle: AtmosphereHandle,
        pos: Vec3,
    ) -> Option<SunLighting> {
        let entry = self.entry_mut(handle);
        let sun = entry.atmosphere.sun?;
        let lut = entry.lut.as_ref()?;
        let ambient_dirty = entry.sun_tracker.update(sun.dir_to_sun());

        entry.atmosphere.sun_lighting(lut, pos, ambient_dirty)
    }

    /// Computes the transmittance along given world-space ray; `None` if the
    /// lookup table isn't ready yet.
    pub fn evaluate_transmittance(
        &self,
        handle: AtmosphereHandle,
        pos: Vec3,
        dir: Vec3,
    ) -> Option<Vec3> {
        let atmosphere = self.get(handle)?;
        let lut = self.lut(handle)?;
        let world_to_local = atmosphere.world_to_local();

        Some(lut.sample(
            &atmosphere.serialize(),
            world_to_local.transform_point3(pos),
            world_to_local.transform_vector3(dir).normalize_or_zero(),
        ))
    }

    fn entry_mut(&mut self, handle: AtmosphereHandle) -> &mut AtmosphereEntry {
        self.entries
            .iter_mut()
            .find(|entry| entry.handle == handle)
            .unwrap_or_else(|| {
                panic!("Atmosphere does not exist: {:?}", handle)
            })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec2, vec3, Affine3A, Mat4};

    use super::*;
    use crate::Sun;

    fn camera() -> Camera {
        Camera::new(
            Affine3A::IDENTITY,
            Mat4::perspective_rh(90f32.to_radians(), 1.0, 0.1, 100.0),
            uvec2(256, 256),
        )
    }

    fn atmosphere(center: Vec3, sun: bool) -> Atmosphere {
        Atmosphere {
            center,
            sun: sun.then(Sun::default),
            ..Default::default()
        }
    }

    #[test]
    fn insertion_order() {
        let mut target = Atmospheres::default();

        let a = target.add(atmosphere(vec3(1.0, 0.0, 0.0), true));
        let b = target.add(atmosphere(vec3(2.0, 0.0, 0.0), true));
        let c = target.add(atmosphere(vec3(3.0, 0.0, 0.0), true));

        target.remove(b);

        let handles: Vec<_> = target.iter().map(|(handle, _)| handle).collect();

        assert_eq!(vec![a, c], handles);
        assert_eq!(2, target.len());
        assert_eq!(None, target.get(b));

        let d = target.add(atmosphere(Vec3::ZERO, true));

        assert_ne!(b, d);
    }

    #[test]
    fn lut_invalidation() {
        let mut target = Atmospheres::default();
        let handle = target.add(atmosphere(Vec3::ZERO, true));
        let lut = TransmittanceLutData::compute(
            &target.get(handle).unwrap().serialize(),
        );

        assert_eq!(vec![handle], target.dirty());

        target.set_lut(handle, lut);

        assert!(target.dirty().is_empty());

        // Moving the planet doesn't affect the table
        target.update(handle, atmosphere(vec3(5.0, 0.0, 0.0), true));

        assert!(target.dirty().is_empty());

        // ... but changing its size does
        target.update(
            handle,
            Atmosphere {
                planet_radius: 3.0,
                atmosphere_radius: 4.0,
                ..atmosphere(Vec3::ZERO, true)
            },
        );

        assert_eq!(vec![handle], target.dirty());
    }

    #[test]
    fn find_visible() {
        let mut target = Atmospheres::default();
        let camera = camera();

        assert!(target.find_visible(&camera).is_none());

        // Behind the camera
        target.add(atmosphere(vec3(0.0, 0.0, 10.0), true));

        // In front of the camera, but without any sun
        target.add(atmosphere(vec3(0.0, 0.0, -10.0), false));

        assert!(target.find_visible(&camera).is_none());

        let a = target.add(atmosphere(vec3(0.0, 0.0, -10.0), true));
        let _b = target.add(atmosphere(vec3(0.0, 0.0, -20.0), true));

        assert_eq!(Some(a), target.find_visible(&camera).map(|(h, _)| h));
    }

    #[test]
    fn sun_lighting() {
        let mut target = Atmospheres::default();
        let handle = target.add(atmosphere(Vec3::ZERO, true));
        let pos = vec3(0.0, 2.1, 0.0);

        // Lookup table not ready yet
        assert_eq!(None, target.sun_lighting(handle, pos));

        target.set_lut(
            handle,
            TransmittanceLutData::compute(
                &target.get(handle).unwrap().serialize(),
            ),
        );

        let lighting = target.sun_lighting(handle, pos).unwrap();

        assert!(lighting.ambient_dirty);

        // Sun hasn't moved since
        let lighting = target.sun_lighting(handle, pos).unwrap();

        assert!(!lighting.ambient_dirty);

        let transmittance = target
            .evaluate_transmittance(handle, pos, vec3(0.0, -1.0, 0.0))
            .unwrap();

        assert_relative_eq!(Vec3::ZERO, transmittance, epsilon = 0.0001);
    }

    #[test]
    #[should_panic(expected = "Atmosphere does not exist")]
    fn unknown_handle() {
        let mut target = Atmospheres::default();
        let handle = target.add(Atmosphere::default());

        target.remove(handle);
        target.update(handle, Atmosphere::default());
    }
}
