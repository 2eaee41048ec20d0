use glam::{uvec3, UVec2, UVec3};

use crate::Bindable;

#[derive(Debug)]
pub struct Texture {
    tex: wgpu::Texture,
    view: wgpu::TextureView,
    mip_views: Vec<wgpu::TextureView>,
    linear_sampler: wgpu::Sampler,
    nearest_sampler: wgpu::Sampler,
    size: UVec3,
    format: wgpu::TextureFormat,
    view_dimension: wgpu::TextureViewDimension,
}

impl Texture {
    pub fn builder(label: impl ToString) -> TextureBuilder {
        TextureBuilder {
            label: label.to_string(),
            size: uvec3(1, 1, 1),
            dimension: wgpu::TextureDimension::D2,
            mip_level_count: 1,
            format: wgpu::TextureFormat::Rgba16Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING,
        }
    }

    pub fn tex(&self) -> &wgpu::Texture {
        &self.tex
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> UVec3 {
        self.size
    }

    /// Size of given mip level of a 2D texture.
    pub fn mip_size(&self, mip: u32) -> UVec2 {
        (self.size.truncate() >> mip).max(UVec2::ONE)
    }

    pub fn mip_level_count(&self) -> u32 {
        self.mip_views.len() as u32
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Uploads texels into the first mip level; `data` must be tightly
    /// packed.
    pub fn write(&self, queue: &wgpu::Queue, data: &[u8]) {
        let bytes_per_texel = self.format.block_copy_size(None).unwrap_or(4);

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.tex,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(self.size.x * bytes_per_texel),
                rows_per_image: Some(self.size.y),
            },
            self.extent(),
        );
    }

    /// Copies the first mip level of `self` into `target`; both textures
    /// must have the same size and format.
    pub fn copy_to(&self, encoder: &mut wgpu::CommandEncoder, target: &Self) {
        encoder.copy_texture_to_texture(
            self.tex.as_image_copy(),
            target.tex.as_image_copy(),
            self.extent(),
        );
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.size.x,
            height: self.size.y,
            depth_or_array_layers: self.size.z,
        }
    }

    /// Binds this texture with a filtering sampler.
    pub fn bind_sampled(&self) -> impl Bindable + '_ {
        TextureBinder {
            parent: self,
            view: &self.view,
            kind: BindingKind::Sampled,
        }
    }

    /// Binds this texture as non-filterable, with a nearest-neighbour
    /// sampler; kernels are expected to fetch texels directly.
    pub fn bind_readable(&self) -> impl Bindable + '_ {
        TextureBinder {
            parent: self,
            view: &self.view,
            kind: BindingKind::Readable,
        }
    }

    /// Binds the first mip level as a read-write storage texture.
    pub fn bind_writable(&self) -> impl Bindable + '_ {
        self.bind_mip_writable(0)
    }

    /// Binds given mip level as a read-write storage texture.
    pub fn bind_mip_writable(&self, mip: u32) -> impl Bindable + '_ {
        TextureBinder {
            parent: self,
            view: &self.mip_views[mip as usize],
            kind: BindingKind::Writable,
        }
    }
}

pub struct TextureBuilder {
    label: String,
    size: UVec3,
    dimension: wgpu::TextureDimension,
    mip_level_count: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
}

impl TextureBuilder {
    pub fn with_size(mut self, size: UVec2) -> Self {
        self.size = size.extend(1);
        self.dimension = wgpu::TextureDimension::D2;
        self
    }

    pub fn with_size_3d(mut self, size: UVec3) -> Self {
        self.size = size;
        self.dimension = wgpu::TextureDimension::D3;
        self
    }

    /// Allocates the entire mip chain, down to 1x1.
    pub fn with_mips(mut self) -> Self {
        let max = self.size.x.max(self.size.y).max(1);

        self.mip_level_count = u32::BITS - max.leading_zeros();
        self
    }

    pub fn with_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_usage(mut self, usage: wgpu::TextureUsages) -> Self {
        self.usage |= usage;
        self
    }

    pub fn build(self, device: &wgpu::Device) -> Texture {
        let label = format!("nimbus_{}", self.label);

        if self.size.cmpeq(UVec3::ZERO).any() {
            log::warn!(
                "Texture `{label}` has a degenerate size ({:?}); clamping",
                self.size
            );
        }

        let size = self.size.max(UVec3::ONE);

        log::debug!(
            "Allocating texture `{label}`; size={size:?}, format={:?}, mips={}",
            self.format,
            self.mip_level_count,
        );

        let tex = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: size.z,
            },
            mip_level_count: self.mip_level_count,
            sample_count: 1,
            dimension: self.dimension,
            format: self.format,
            usage: self.usage,
            view_formats: &[],
        });

        let view = tex.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{label}_view")),
            ..Default::default()
        });

        let mip_views = (0..self.mip_level_count)
            .map(|mip| {
                tex.create_view(&wgpu::TextureViewDescriptor {
                    label: Some(&format!("{label}_mip{mip}_view")),
                    base_mip_level: mip,
                    mip_level_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label}_linear_sampler")),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let nearest_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label}_nearest_sampler")),
            ..Default::default()
        });

        let view_dimension = match self.dimension {
            wgpu::TextureDimension::D3 => wgpu::TextureViewDimension::D3,
            _ => wgpu::TextureViewDimension::D2,
        };

        Texture {
            tex,
            view,
            mip_views,
            linear_sampler,
            nearest_sampler,
            size,
            format: self.format,
            view_dimension,
        }
    }
}

enum BindingKind {
    Sampled,
    Readable,
    Writable,
}

struct TextureBinder<'a> {
    parent: &'a Texture,
    view: &'a wgpu::TextureView,
    kind: BindingKind,
}

impl Bindable for TextureBinder<'_> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        let visibility =
            wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE;

        let view_dimension = self.parent.view_dimension;

        let (filterable, sampler) = match self.kind {
            BindingKind::Writable => {
                let layout = wgpu::BindGroupLayoutEntry {
                    binding,
                    visibility,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::ReadWrite,
                        format: self.parent.format,
                        view_dimension,
                    },
                    count: None,
                };

                let resource = wgpu::BindingResource::TextureView(self.view);

                return vec![(layout, resource)];
            }

            BindingKind::Sampled => (true, &self.parent.linear_sampler),
            BindingKind::Readable => (false, &self.parent.nearest_sampler),
        };

        let tex_layout = wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension,
                sample_type: wgpu::TextureSampleType::Float { filterable },
            },
            count: None,
        };

        let sampler_layout = wgpu::BindGroupLayoutEntry {
            binding: binding + 1,
            visibility,
            ty: wgpu::BindingType::Sampler(if filterable {
                wgpu::SamplerBindingType::Filtering
            } else {
                wgpu::SamplerBindingType::NonFiltering
            }),
            count: None,
        };

        let tex_resource = wgpu::BindingResource::TextureView(self.view);
        let sampler_resource = wgpu::BindingResource::Sampler(sampler);

        vec![
            (tex_layout, tex_resource),
            (sampler_layout, sampler_resource),
        ]
    }
}
