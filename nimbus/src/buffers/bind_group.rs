use crate::Bindable;

/// Bind group together with the layout it was created from.
///
/// Bindings get numbered in order of the items, each item taking as many
/// slots as it needs (a sampled texture takes two: the texture itself and
/// its sampler).
#[derive(Debug)]
pub struct BindGroup {
    group: wgpu::BindGroup,
    layout: wgpu::BindGroupLayout,
}

impl BindGroup {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        items: &[&dyn Bindable],
    ) -> Self {
        let label = format!("nimbus_{label}");
        let mut layout_entries = Vec::new();
        let mut entries = Vec::new();

        for item in items {
            for (layout_entry, resource) in item.bind(entries.len() as u32) {
                entries.push(wgpu::BindGroupEntry {
                    binding: layout_entry.binding,
                    resource,
                });

                layout_entries.push(layout_entry);
            }
        }

        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{label}_layout")),
                entries: &layout_entries,
            });

        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&label),
            layout: &layout,
            entries: &entries,
        });

        Self { group, layout }
    }

    pub fn group(&self) -> &wgpu::BindGroup {
        &self.group
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }
}
