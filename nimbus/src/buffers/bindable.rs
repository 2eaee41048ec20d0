/// Resource a kernel can read or write: a uniform, a storage buffer or a
/// texture (optionally accompanied by its sampler).
pub trait Bindable {
    /// Returns layout entries and resources starting at slot `binding`.
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)>;
}
