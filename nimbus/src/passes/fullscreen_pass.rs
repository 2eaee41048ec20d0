use std::marker::PhantomData;
use std::mem;

use bytemuck::Pod;
use log::debug;

use crate::{Bindable, PassLayout, PassLayoutBuilder};

/// Single screen-covering triangle drawn into the camera's output, with
/// push constants of type `P` visible to the fragment stage.
#[derive(Debug)]
pub struct FullscreenPass<P = ()> {
    layout: PassLayout,
    pipeline: wgpu::RenderPipeline,
    _params: PhantomData<P>,
}

impl<P> FullscreenPass<P>
where
    P: Pod,
{
    pub fn builder<'a>(label: impl ToString) -> FullscreenPassBuilder<'a, P> {
        FullscreenPassBuilder {
            layout: PassLayoutBuilder::new(label),
            blend: wgpu::BlendState::REPLACE,
            _params: PhantomData,
        }
    }

    pub fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
        params: P,
        externals: &[&wgpu::BindGroup],
    ) {
        let bind_groups = self.layout.bind_groups(externals);
        let label = format!("nimbus_{}_pass", self.layout.label());

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);

        for (idx, bind_group) in bind_groups.into_iter().enumerate() {
            pass.set_bind_group(idx as u32, bind_group, &[]);
        }

        if mem::size_of::<P>() > 0 {
            pass.set_push_constants(
                wgpu::ShaderStages::FRAGMENT,
                0,
                bytemuck::bytes_of(&params),
            );
        }

        pass.draw(0..3, 0..1);
    }
}

pub struct FullscreenPassBuilder<'a, P> {
    layout: PassLayoutBuilder<'a>,
    blend: wgpu::BlendState,
    _params: PhantomData<P>,
}

impl<'a, P> FullscreenPassBuilder<'a, P>
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

    pub fn bind_external(mut self, layout: &'a wgpu::BindGroupLayout) -> Self {
        self.layout.bind_external(layout);
        self
    }

    /// Blending against the output's current contents; replaces them by
    /// default.
    pub fn with_blend(mut self, blend: wgpu::BlendState) -> Self {
        self.blend = blend;
        self
    }

    pub fn build(
        self,
        device: &wgpu::Device,
        (vs_module, vs_entry_point): &(wgpu::ShaderModule, &'static str),
        (fs_module, fs_entry_point): &(wgpu::ShaderModule, &'static str),
        format: wgpu::TextureFormat,
    ) -> FullscreenPass<P> {
        debug!(
            "Creating fullscreen pass `{}`; format={format:?}",
            self.layout.label(),
        );

        let layout =
            self.layout.build::<P>(device, wgpu::ShaderStages::FRAGMENT);

        let label = format!("nimbus_{}_pipeline", layout.label());

        let pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&label),
                layout: Some(layout.pipeline_layout()),
                vertex: wgpu::VertexState {
                    module: vs_module,
                    entry_point: Some(vs_entry_point),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: fs_module,
                    entry_point: Some(fs_entry_point),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(self.blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
                cache: None,
            });

        FullscreenPass {
            layout,
            pipeline,
            _params: PhantomData,
        }
    }
}
