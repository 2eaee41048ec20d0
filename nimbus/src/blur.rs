use glam::UVec2;
use log::debug;

use crate::{gpu, ComputePass, Shaders, StorageBuffer, Texture};

/// Normalized, one-dimensional Gaussian kernel.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianKernel {
    half_size: u32,
    sigma: f32,
    weights: Vec<f32>,
}

impl GaussianKernel {
    /// Largest supported half size; larger ones get clamped.
    pub const MAX_HALF_SIZE: u32 = 32;

    /// Creates a kernel spanning `2 * half_size + 1` texels; returns `None`
    /// when the kernel wouldn't blur anything.
    pub fn new(half_size: u32, sigma: f32) -> Option<Self> {
        if half_size == 0 || sigma <= 0.0 {
            return None;
        }

        let half_size = half_size.min(Self::MAX_HALF_SIZE);

        let mut weights: Vec<_> = (0..=(2 * half_size))
            .map(|i| {
                let x = (i as f32) - (half_size as f32);

                gpu::gaussian_weight(x, sigma)
            })
            .collect();

        let sum: f32 = weights.iter().sum();

        for weight in &mut weights {
            *weight /= sum;
        }

        Some(Self {
            half_size,
            sigma,
            weights,
        })
    }

    pub fn half_size(&self) -> u32 {
        self.half_size
    }

    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }
}

/// Separable Gaussian blur of a single texture, performed in place.
#[derive(Debug)]
pub struct GaussianBlur {
    weights: StorageBuffer<f32>,
    kernel: Option<GaussianKernel>,
    _scratch: Texture,
    horizontal_pass: ComputePass<gpu::BlurPassParams>,
    vertical_pass: ComputePass<gpu::BlurPassParams>,
    size: UVec2,
}

impl GaussianBlur {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        label: &str,
        texture: &Texture,
    ) -> Self {
        let size = texture.size().truncate();

        debug!("Initializing blur `{label}`; size={size:?}");

        let weights = StorageBuffer::new(
            device,
            format!("{label}_blur_weights"),
            2 * GaussianKernel::MAX_HALF_SIZE as usize + 1,
        );

        let scratch = Texture::builder(format!("{label}_blur_scratch"))
            .with_size(size)
            .with_format(texture.format())
            .build(device);

        let horizontal_pass =
            ComputePass::builder(format!("{label}_blur_horizontal"))
                .bind([
                    &weights,
                    &texture.bind_readable(),
                    &scratch.bind_writable(),
                ])
                .build(device, &shaders.blur);

        let vertical_pass =
            ComputePass::builder(format!("{label}_blur_vertical"))
                .bind([
                    &weights,
                    &scratch.bind_readable(),
                    &texture.bind_writable(),
                ])
                .build(device, &shaders.blur);

        Self {
            weights,
            kernel: None,
            _scratch: scratch,
            horizontal_pass,
            vertical_pass,
            size,
        }
    }

    /// Blurs the texture; does nothing if the kernel is degenerate (e.g.
    /// `half_size` is zero).
    pub fn run(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        half_size: u32,
        sigma: f32,
        blur_alpha: bool,
    ) {
        let Some(kernel) = GaussianKernel::new(half_size, sigma) else {
            return;
        };

        if self.kernel.as_ref() != Some(&kernel) {
            self.weights.write(queue, kernel.weights());
            self.kernel = Some(kernel);
        }

        let half_size = self
            .kernel
            .as_ref()
            .map_or(0, |kernel| kernel.half_size());

        let workgroups = crate::workgroups_2d(self.size);

        self.horizontal_pass.run(
            encoder,
            workgroups,
            gpu::BlurPassParams::horizontal(self.size, half_size, blur_alpha),
        );

        self.vertical_pass.run(
            encoder,
            workgroups,
            gpu::BlurPassParams::vertical(self.size, half_size, blur_alpha),
        );
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn weights() {
        let target = GaussianKernel::new(3, 2.0).unwrap();

        assert_eq!(7, target.weights().len());

        assert_relative_eq!(
            1.0,
            target.weights().iter().sum::<f32>(),
            epsilon = 0.0001
        );

        // Symmetric, peaking at the center
        for i in 0..3 {
            assert_relative_eq!(target.weights()[i], target.weights()[6 - i]);
            assert!(target.weights()[i] < target.weights()[i + 1]);
        }
    }

    #[test]
    fn degenerate() {
        assert_eq!(None, GaussianKernel::new(0, 2.0));
        assert_eq!(None, GaussianKernel::new(3, 0.0));
        assert_eq!(None, GaussianKernel::new(3, -1.0));
    }

    #[test]
    fn clamped() {
        let target = GaussianKernel::new(1000, 300.0).unwrap();

        assert_eq!(GaussianKernel::MAX_HALF_SIZE, target.half_size());
        assert_eq!(65, target.weights().len());
    }
}
