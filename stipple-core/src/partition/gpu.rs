//! GPU partition backend: a brute-force nearest-site compute shader.
//!
//! Matches the CPU backend's nearest-site rule exactly (pixel centers,
//! squared Euclidean distance, strict `<` so the lowest index wins ties)
//! so a caller can switch backends without changing behavior beyond
//! floating-point rounding differences between a GPU's f32 math and the
//! CPU backend's f64 math.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::error::{Error, Result};
use crate::index_map::IndexMap;
use crate::position::Position;

use super::PartitionBackend;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SiteData {
    x: f32,
    y: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Uniforms {
    width: u32,
    height: u32,
    num_sites: u32,
    _pad: u32,
}

const COMPUTE_SHADER: &str = r#"
struct Uniforms {
    width: u32,
    height: u32,
    num_sites: u32,
    _pad: u32,
}

struct Site {
    x: f32,
    y: f32,
}

@group(0) @binding(0) var<uniform> uniforms: Uniforms;
@group(0) @binding(1) var<storage, read> sites: array<Site>;
@group(0) @binding(2) var<storage, read_write> output: array<i32>;

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let x = global_id.x;
    let y = global_id.y;

    if (x >= uniforms.width || y >= uniforms.height) {
        return;
    }

    let px = f32(x) + 0.5;
    let py = f32(y) + 0.5;

    var min_dist = 3.402823e+38f;
    var nearest: i32 = 0;

    for (var i: u32 = 0u; i < uniforms.num_sites; i = i + 1u) {
        let site = sites[i];
        let dx = px - site.x;
        let dy = py - site.y;
        let dist = dx * dx + dy * dy;
        if (dist < min_dist) {
            min_dist = dist;
            nearest = i32(i);
        }
    }

    let idx = y * uniforms.width + x;
    output[idx] = nearest;
}
"#;

/// GPU backend using a wgpu compute shader, reused across `partition` calls.
pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl GpuBackend {
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::default();

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| Error::BackendInit("no suitable GPU adapter found".into()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("stipple partition device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| Error::BackendInit(format!("failed to create device: {e}")))?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("stipple partition bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("stipple partition compute shader"),
            source: wgpu::ShaderSource::Wgsl(COMPUTE_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("stipple partition pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("stipple partition pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
        })
    }
}

impl PartitionBackend for GpuBackend {
    fn partition(&mut self, points: &[Position], width: u32, height: u32) -> Result<IndexMap> {
        if points.is_empty() {
            return Err(Error::EmptyGeneratorSet);
        }

        let num_pixels = (width * height) as usize;
        let num_sites = points.len();

        let uniforms = Uniforms {
            width,
            height,
            num_sites: num_sites as u32,
            _pad: 0,
        };
        let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("stipple partition uniforms"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let site_data: Vec<SiteData> = points
            .iter()
            .map(|p| SiteData {
                x: (p.x * width as f64) as f32,
                y: (p.y * height as f64) as f32,
            })
            .collect();
        let sites_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("stipple partition sites"),
            contents: bytemuck::cast_slice(&site_data),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let output_size = (num_pixels * std::mem::size_of::<i32>()) as u64;
        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stipple partition output"),
            size: output_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stipple partition staging"),
            size: output_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stipple partition bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: sites_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: output_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("stipple partition encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("stipple partition pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let workgroups_x = (width + 15) / 16;
            let workgroups_y = (height + 15) / 16;
            pass.dispatch_workgroups(workgroups_x, workgroups_y, 1);
        }
        encoder.copy_buffer_to_buffer(&output_buffer, 0, &staging_buffer, 0, output_size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| Error::BackendRuntime(format!("map_async channel closed: {e}")))?
            .map_err(|e| Error::BackendRuntime(format!("buffer map failed: {e:?}")))?;

        let data = buffer_slice.get_mapped_range();
        let raw: &[i32] = bytemuck::cast_slice(&data);
        let indices: Vec<u32> = raw.iter().map(|&i| i as u32).collect();
        drop(data);
        staging_buffer.unmap();

        Ok(IndexMap::new(width, height, num_sites as u32, indices))
    }
}
