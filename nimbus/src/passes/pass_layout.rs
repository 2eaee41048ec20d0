use std::mem;

use log::debug;

use crate::{BindGroup, Bindable};

/// Bind groups and pipeline layout of a pass.
///
/// Groups owned by the pass occupy the first slots; the remaining ones are
/// external, i.e. provided by the caller on each run (e.g. the scene's depth
/// buffer, which changes from frame to frame).
#[derive(Debug)]
pub struct PassLayout {
    label: String,
    owned: Vec<BindGroup>,
    externals: usize,
    pipeline_layout: wgpu::PipelineLayout,
}

impl PassLayout {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pipeline_layout(&self) -> &wgpu::PipelineLayout {
        &self.pipeline_layout
    }

    /// Returns all bind groups, in order of their slots.
    ///
    /// # Panics
    ///
    /// Panics if the number of `externals` doesn't match the layout.
    pub fn bind_groups<'a>(
        &'a self,
        externals: &[&'a wgpu::BindGroup],
    ) -> Vec<&'a wgpu::BindGroup> {
        assert_eq!(
            self.externals,
            externals.len(),
            "Pass `{}` expects {} external bind group(s)",
            self.label,
            self.externals,
        );

        self.owned
            .iter()
            .map(BindGroup::group)
            .chain(externals.iter().copied())
            .collect()
    }
}

pub struct PassLayoutBuilder<'a> {
    label: String,
    owned: Vec<Vec<&'a dyn Bindable>>,
    externals: Vec<&'a wgpu::BindGroupLayout>,
}

impl<'a> PassLayoutBuilder<'a> {
    pub fn new(label: impl ToString) -> Self {
        Self {
            label: label.to_string(),
            owned: Vec::new(),
            externals: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn bind(&mut self, items: &[&'a dyn Bindable]) {
        assert!(
            self.externals.is_empty(),
            "Pass `{}` binds an owned group after an external one",
            self.label,
        );

        self.owned.push(items.to_vec());
    }

    pub fn bind_external(&mut self, layout: &'a wgpu::BindGroupLayout) {
        self.externals.push(layout);
    }

    /// Creates the bind groups and a pipeline layout with a single push
    /// constant range of `P`, visible to `stages`.
    pub fn build<P>(
        self,
        device: &wgpu::Device,
        stages: wgpu::ShaderStages,
    ) -> PassLayout {
        let push_constant_size = mem::size_of::<P>() as u32;

        debug!(
            "Creating pass layout `{}`; groups={}+{}, push_constants={}",
            self.label,
            self.owned.len(),
            self.externals.len(),
            push_constant_size,
        );

        let owned: Vec<_> = self
            .owned
            .iter()
            .enumerate()
            .map(|(idx, items)| {
                let label = format!("{}_bg{idx}", self.label);

                BindGroup::new(device, &label, items)
            })
            .collect();

        let bind_group_layouts: Vec<_> = owned
            .iter()
            .map(BindGroup::layout)
            .chain(self.externals.iter().copied())
            .collect();

        let push_constant_ranges: Vec<_> = (push_constant_size > 0)
            .then_some(wgpu::PushConstantRange {
                stages,
                range: 0..push_constant_size,
            })
            .into_iter()
            .collect();

        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("nimbus_{}_pipeline_layout", self.label)),
                bind_group_layouts: &bind_group_layouts,
                push_constant_ranges: &push_constant_ranges,
            });

        PassLayout {
            label: self.label,
            owned,
            externals: self.externals.len(),
            pipeline_layout,
        }
    }
}
