use std::ops::{Deref, DerefMut};
use std::{any, mem};

use bytemuck::Pod;

use crate::Bindable;

/// Uniform buffer with a host-side copy of its contents.
///
/// Modifications (through [`Self::set()`] or [`DerefMut`]) mark the buffer
/// dirty; [`Self::flush()`] uploads it only then, so parameters that stay
/// the same between frames cost nothing.
#[derive(Debug)]
pub struct MappedUniformBuffer<T> {
    buffer: wgpu::Buffer,
    data: T,
    dirty: bool,
}

impl<T> MappedUniformBuffer<T>
where
    T: Pod,
{
    /// Uniform blocks get laid out with 16-byte alignment.
    const ALIGNMENT: u64 = 16;

    pub fn new(device: &wgpu::Device, label: impl AsRef<str>, data: T) -> Self {
        let label = format!("nimbus_{}", label.as_ref());
        let size = mem::size_of::<T>().max(1) as u64;
        let size = wgpu::util::align_to(size, Self::ALIGNMENT);

        log::debug!(
            "Allocating uniform `{label}`; ty={}, size={size}",
            any::type_name::<T>(),
        );

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&label),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            data,
            dirty: true,
        }
    }

    pub fn new_default(device: &wgpu::Device, label: impl AsRef<str>) -> Self
    where
        T: Default,
    {
        Self::new(device, label, T::default())
    }

    /// Replaces the contents; the buffer becomes dirty only if they differ.
    pub fn set(&mut self, data: T)
    where
        T: PartialEq,
    {
        if self.data != data {
            self.data = data;
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Uploads the contents if they changed since the last flush.
    pub fn flush(&mut self, queue: &wgpu::Queue) {
        if self.dirty {
            queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&self.data));
            self.dirty = false;
        }
    }
}

impl<T> Deref for MappedUniformBuffer<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for MappedUniformBuffer<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.dirty = true;
        &mut self.data
    }
}

impl<T> Bindable for MappedUniformBuffer<T> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        let layout_entry = wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE
                | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        vec![(layout_entry, self.buffer.as_entire_binding())]
    }
}
