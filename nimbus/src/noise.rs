use glam::{uvec2, UVec2, Vec2};
use image::DynamicImage;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Texture;

/// Single-channel noise texture, as stored on the host.
#[derive(Clone, Debug, PartialEq)]
pub struct BlueNoiseData {
    size: UVec2,
    texels: Vec<f32>,
}

impl BlueNoiseData {
    /// Size of the noise generated when the host doesn't provide any.
    pub const FALLBACK_SIZE: u32 = 64;

    /// Converts an image into noise, using its luminance.
    pub fn from_image(image: &DynamicImage) -> Self {
        let image = image.to_luma8();

        Self {
            size: uvec2(image.width(), image.height()).max(UVec2::ONE),
            texels: if image.is_empty() {
                vec![0.0]
            } else {
                image.pixels().map(|px| (px.0[0] as f32) / 255.0).collect()
            },
        }
    }

    /// Generates white noise; not as pleasant as real blue noise, but good
    /// enough to break up banding.
    pub fn white(size: UVec2, seed: u64) -> Self {
        let size = size.max(UVec2::ONE);
        let mut rng = StdRng::seed_from_u64(seed);

        Self {
            size,
            texels: (0..(size.x * size.y)).map(|_| rng.gen()).collect(),
        }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn texels(&self) -> &[f32] {
        &self.texels
    }
}

impl Default for BlueNoiseData {
    fn default() -> Self {
        Self::white(UVec2::splat(Self::FALLBACK_SIZE), 0)
    }
}

/// Blue noise used to dither the first raymarching step of clouds.
#[derive(Debug)]
pub struct BlueNoise {
    texture: Texture,
}

impl BlueNoise {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &BlueNoiseData,
    ) -> Self {
        debug!("Uploading blue noise; size={:?}", data.size());

        let texture = Texture::builder("blue_noise")
            .with_size(data.size())
            .with_format(wgpu::TextureFormat::R32Float)
            .with_usage(wgpu::TextureUsages::COPY_DST)
            .build(device);

        texture.write(queue, bytemuck::cast_slice(data.texels()));

        Self { texture }
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn size(&self) -> UVec2 {
        self.texture.size().truncate()
    }

    /// Returns a random offset applied to noise lookups, so that consecutive
    /// frames don't share the same pattern.
    ///
    /// The offset is expressed in fractions of the target texture and it's
    /// always a whole number of texels, so that each texel keeps looking up a
    /// single noise texel.
    pub fn jitter(rng: &mut impl Rng, target_size: UVec2) -> Vec2 {
        let size = target_size.max(UVec2::ONE).as_vec2();
        let offset = Vec2::new(rng.gen(), rng.gen());

        (offset * size).round() / size
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;

    #[test]
    fn from_image() {
        let mut image = GrayImage::new(2, 1);

        image.put_pixel(0, 0, Luma([0]));
        image.put_pixel(1, 0, Luma([255]));

        let target =
            BlueNoiseData::from_image(&DynamicImage::ImageLuma8(image));

        assert_eq!(uvec2(2, 1), target.size());
        assert_eq!(&[0.0, 1.0], target.texels());
    }

    #[test]
    fn white() {
        let target = BlueNoiseData::white(uvec2(16, 8), 123);

        assert_eq!(128, target.texels().len());

        assert!(target
            .texels()
            .iter()
            .all(|texel| (0.0..1.0).contains(texel)));

        assert_eq!(target, BlueNoiseData::white(uvec2(16, 8), 123));
        assert_ne!(target, BlueNoiseData::white(uvec2(16, 8), 321));
    }

    #[test]
    fn jitter() {
        let mut rng = StdRng::seed_from_u64(0);
        let size = uvec2(128, 90);

        for _ in 0..100 {
            let jitter = BlueNoise::jitter(&mut rng, size);
            let texels = jitter * size.as_vec2();

            assert!(jitter.cmpge(Vec2::ZERO).all());
            assert!(jitter.cmple(Vec2::ONE).all());
            assert!((texels - texels.round()).abs().max_element() < 0.001);
        }
    }
}
