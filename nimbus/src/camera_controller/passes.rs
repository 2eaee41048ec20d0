use log::debug;

use crate::{Camera, CameraBuffers, EngineContext};

macro_rules! passes {
    ([ $( $name:ident => $class:ident, )* ]) => {
        $( mod $name; )*
        $( pub use self::$name::*; )*

        #[derive(Debug)]
        pub struct CameraPasses {
            $( pub $name: $class, )*
        }

        impl CameraPasses {
            pub fn new(
                ctxt: &EngineContext,
                device: &wgpu::Device,
                camera: &Camera,
                buffers: &CameraBuffers,
            ) -> Self {
                debug!("Initializing camera passes");

                Self {
                    $( $name: $class::new(ctxt, device, camera, buffers), )*
                }
            }
        }
    };
}

passes!([
    aerial_perspective => AerialPerspectivePass,
    sky => SkyPass,
    sky_composite => SkyCompositePass,
]);
