use std::marker::PhantomData;
use std::{any, mem};

use bytemuck::Pod;
use log::warn;

use crate::Bindable;

/// GPU-only array of `T`s with a fixed capacity, written from the host in
/// whole slices (e.g. a blur's weights).
#[derive(Debug)]
pub struct StorageBuffer<T> {
    buffer: wgpu::Buffer,
    capacity: usize,
    _ty: PhantomData<T>,
}

impl<T> StorageBuffer<T>
where
    T: Pod,
{
    pub fn new(
        device: &wgpu::Device,
        label: impl AsRef<str>,
        capacity: usize,
    ) -> Self {
        let label = format!("nimbus_{}", label.as_ref());
        let size = (capacity.max(1) * mem::size_of::<T>()) as u64;

        log::debug!(
            "Allocating storage buffer `{label}`; ty={}, capacity={capacity}",
            any::type_name::<T>(),
        );

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            capacity,
            _ty: PhantomData,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Uploads `items` at the beginning of the buffer; items past the
    /// capacity get dropped.
    pub fn write(&self, queue: &wgpu::Queue, items: &[T]) {
        let items = if items.len() > self.capacity {
            warn!(
                "Storage buffer overflow: got {} items, capacity is {}",
                items.len(),
                self.capacity,
            );

            &items[..self.capacity]
        } else {
            items
        };

        if !items.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(items));
        }
    }
}

impl<T> Bindable for StorageBuffer<T> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        let layout_entry = wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                // rust-gpu doesn't decorate `&[T]` bindings as non-writable,
                // so naga rejects kernels bound to read-only layouts
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        vec![(layout_entry, self.buffer.as_entire_binding())]
    }
}
