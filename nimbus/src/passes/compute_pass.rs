use std::marker::PhantomData;
use std::mem;

use bytemuck::Pod;
use glam::UVec3;
use log::debug;

use crate::{Bindable, PassLayout, PassLayoutBuilder};

/// Compute kernel dispatched with push constants of type `P`.
#[derive(Debug)]
pub struct ComputePass<P = ()> {
    layout: PassLayout,
    pipeline: wgpu::ComputePipeline,
    _params: PhantomData<P>,
}

impl<P> ComputePass<P>
where
    P: Pod,
{
    pub fn builder<'a>(label: impl ToString) -> ComputePassBuilder<'a, P> {
        ComputePassBuilder {
            layout: PassLayoutBuilder::new(label),
            _params: PhantomData,
        }
    }

    pub fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        workgroups: UVec3,
        params: P,
    ) {
        self.run_with(encoder, workgroups, params, &[]);
    }

    /// Dispatches the kernel, filling external slots with `externals`.
    pub fn run_with(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        workgroups: UVec3,
        params: P,
        externals: &[&wgpu::BindGroup],
    ) {
        let bind_groups = self.layout.bind_groups(externals);
        let label = format!("nimbus_{}_pass", self.layout.label());

        let mut pass =
            encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&label),
                timestamp_writes: None,
            });

        pass.set_pipeline(&self.pipeline);

        for (idx, bind_group) in bind_groups.into_iter().enumerate() {
            pass.set_bind_group(idx as u32, bind_group, &[]);
        }

        if mem::size_of::<P>() > 0 {
            pass.set_push_constants(0, bytemuck::bytes_of(&params));
        }

        pass.dispatch_workgroups(workgroups.x, workgroups.y, workgroups.z);
    }
}

pub struct ComputePassBuilder<'a, P> {
    layout: PassLayoutBuilder<'a>,
    _params: PhantomData<P>,
}

impl<'a, P> ComputePassBuilder<'a, P>
where
    P: Pod,
{
    pub fn bind<const N: usize>(
        mut self,
        items: [&'a dyn Bindable; N],
    ) -> Self {
        self.layout.bind(&items);
        self
    }

    /// Reserves the next slot for a group provided on each run; must come
    /// after all [`Self::bind()`]s.
    pub fn bind_external(mut self, layout: &'a wgpu::BindGroupLayout) -> Self {
        self.layout.bind_external(layout);
        self
    }

    pub fn build(
        self,
        device: &wgpu::Device,
        (module, entry_point): &(wgpu::ShaderModule, &'static str),
    ) -> ComputePass<P> {
        debug!("Creating compute pass `{}`", self.layout.label());

        let layout =
            self.layout.build::<P>(device, wgpu::ShaderStages::COMPUTE);

        let label = format!("nimbus_{}_pipeline", layout.label());

        let pipeline =
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(&label),
                layout: Some(layout.pipeline_layout()),
                module,
                entry_point: Some(entry_point),
                compilation_options: wgpu::PipelineCompilationOptions {
                    zero_initialize_workgroup_memory: false,
                    ..Default::default()
                },
                cache: None,
            });

        ComputePass {
            layout,
            pipeline,
            _params: PhantomData,
        }
    }
}
