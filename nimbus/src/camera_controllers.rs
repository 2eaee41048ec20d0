use std::ops::{Index, IndexMut};

use fxhash::FxHashMap;

use crate::{CameraController, CameraHandle};

/// Cameras registered in the engine, addressed by never-reused handles.
#[derive(Debug, Default)]
pub struct CameraControllers {
    cameras: FxHashMap<CameraHandle, CameraController>,
    next_id: usize,
}

impl CameraControllers {
    pub fn add(&mut self, camera: CameraController) -> CameraHandle {
        let handle = CameraHandle::new(self.next_id);

        self.next_id += 1;
        self.cameras.insert(handle, camera);

        handle
    }

    pub fn contains(&self, handle: CameraHandle) -> bool {
        self.cameras.contains_key(&handle)
    }

    pub fn iter_mut(
        &mut self,
    ) -> impl Iterator<Item = &mut CameraController> + '_ {
        self.cameras.values_mut()
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    pub fn remove(
        &mut self,
        handle: CameraHandle,
    ) -> Option<CameraController> {
        self.cameras.remove(&handle)
    }
}

impl Index<CameraHandle> for CameraControllers {
    type Output = CameraController;

    fn index(&self, handle: CameraHandle) -> &CameraController {
        self.cameras
            .get(&handle)
            .unwrap_or_else(|| panic!("Unknown camera: {handle:?}"))
    }
}

impl IndexMut<CameraHandle> for CameraControllers {
    fn index_mut(&mut self, handle: CameraHandle) -> &mut CameraController {
        self.cameras
            .get_mut(&handle)
            .unwrap_or_else(|| panic!("Unknown camera: {handle:?}"))
    }
}
