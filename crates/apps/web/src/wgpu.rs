//! wgpu renderer for the globe scene.
//!
//! Tessellation and the instance/uniform layouts are plain data and build on
//! every target. Device code lives in the wasm32 `imp`; other targets get a
//! stub that reports the renderer as unavailable.

use bytemuck::{Pod, Zeroable};
use foundation::math::Vec3;
use scene::components::{Blending, Material, Side};

use crate::draw::{DrawList, PointsDraw, SphereDraw};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Unit UV sphere with `segments` slices and stacks.
///
/// Row 0 is the north pole and `uv.y` grows southwards, so an
/// equirectangular image maps with its top row at the pole. Triangles wind
/// counter-clockwise seen from outside; the degenerate pole triangles are
/// skipped.
pub fn sphere_mesh(segments: u32) -> (Vec<MeshVertex>, Vec<u32>) {
    let w = segments.max(3);
    let h = segments.max(2);
    let mut vertices = Vec::with_capacity(((w + 1) * (h + 1)) as usize);

    for iy in 0..=h {
        let v = iy as f32 / h as f32;
        let u_offset = if iy == 0 {
            0.5 / w as f32
        } else if iy == h {
            -0.5 / w as f32
        } else {
            0.0
        };
        let theta = v * std::f32::consts::PI;
        for ix in 0..=w {
            let u = ix as f32 / w as f32;
            let phi = u * std::f32::consts::TAU;
            let p = [
                -phi.cos() * theta.sin(),
                theta.cos(),
                phi.sin() * theta.sin(),
            ];
            vertices.push(MeshVertex {
                position: p,
                normal: p,
                uv: [u + u_offset, v],
            });
        }
    }

    let row = w + 1;
    let mut indices = Vec::with_capacity((6 * w * h) as usize);
    for iy in 0..h {
        for ix in 0..w {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != h - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    (vertices, indices)
}

/// Per-sphere instance data. Colors are linear; `params` is
/// `(roughness, metalness, textured, unlit)`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SphereInstance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub emissive: [f32; 4],
    pub params: [f32; 4],
}

fn flag(on: bool) -> f32 {
    if on { 1.0 } else { 0.0 }
}

impl SphereInstance {
    pub fn from_draw(draw: &SphereDraw) -> Self {
        let m = &draw.material;
        let [r, g, b] = m.color.to_linear();
        let [er, eg, eb] = m.emissive.to_linear();
        let k = m.emissive_intensity;
        Self {
            model: draw.model.to_f32_cols(),
            color: [r, g, b, m.opacity.clamp(0.0, 1.0)],
            emissive: [er * k, eg * k, eb * k, 0.0],
            params: [
                m.roughness,
                m.metalness,
                flag(m.textured),
                flag(m.unlit),
            ],
        }
    }
}

/// One point of a cloud, already in world space. `size` is in world units.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct StarInstance {
    pub position: [f32; 3],
    pub size: f32,
    pub color: [f32; 4],
}

pub fn star_instances(points: &[Vec3], draw: &PointsDraw) -> Vec<StarInstance> {
    let [r, g, b] = draw.material.color.to_linear();
    let color = [r, g, b, draw.material.opacity.clamp(0.0, 1.0)];
    points
        .iter()
        .map(|p| StarInstance {
            position: draw.model.transform_point(*p).to_f32(),
            size: draw.material.point_size,
            color,
        })
        .collect()
}

/// Per-frame uniform block. Every member is 16-byte aligned for WebGL2.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Globals {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
    pub light_dir: [f32; 4],
    pub light_color: [f32; 4],
    pub ambient: [f32; 4],
    /// `(width_px, height_px, aspect, 0)`.
    pub viewport: [f32; 4],
}

impl Globals {
    pub fn from_draw_list(list: &DrawList, width: u32, height: u32) -> Self {
        let [ex, ey, ez] = list.eye.to_f32();
        let [lx, ly, lz] = list.lighting.directional.direction_to_light().to_f32();
        let sun = list.lighting.directional;
        let [sr, sg, sb] = sun.color.to_linear();
        let amb = list.lighting.ambient;
        let [ar, ag, ab] = amb.color.to_linear();
        Self {
            view_proj: list.view_proj.to_f32_cols(),
            eye: [ex, ey, ez, 1.0],
            light_dir: [lx, ly, lz, 0.0],
            light_color: [sr * sun.intensity, sg * sun.intensity, sb * sun.intensity, 1.0],
            ambient: [ar * amb.intensity, ag * amb.intensity, ab * amb.intensity, 1.0],
            viewport: [width as f32, height as f32, list.aspect as f32, 0.0],
        }
    }
}

/// Mesh pipeline variant. One pipeline is built per key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub side: Side,
    pub blending: Blending,
}

impl PipelineKey {
    pub const ALL: [PipelineKey; 6] = [
        PipelineKey { side: Side::Front, blending: Blending::Normal },
        PipelineKey { side: Side::Front, blending: Blending::Additive },
        PipelineKey { side: Side::Back, blending: Blending::Normal },
        PipelineKey { side: Side::Back, blending: Blending::Additive },
        PipelineKey { side: Side::Double, blending: Blending::Normal },
        PipelineKey { side: Side::Double, blending: Blending::Additive },
    ];

    pub fn for_material(material: &Material) -> Self {
        Self {
            side: material.side,
            blending: material.blending,
        }
    }

    /// Position in [`PipelineKey::ALL`].
    pub fn index(self) -> usize {
        let side = match self.side {
            Side::Front => 0,
            Side::Back => 1,
            Side::Double => 2,
        };
        let blend = match self.blending {
            Blending::Normal => 0,
            Blending::Additive => 1,
        };
        side * 2 + blend
    }

    pub fn cull_mode(self) -> Option<::wgpu::Face> {
        match self.side {
            Side::Front => Some(::wgpu::Face::Back),
            Side::Back => Some(::wgpu::Face::Front),
            Side::Double => None,
        }
    }

    /// Shaders write premultiplied alpha.
    pub fn blend_state(self) -> ::wgpu::BlendState {
        match self.blending {
            Blending::Normal => ::wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
            Blending::Additive => ::wgpu::BlendState {
                color: ::wgpu::BlendComponent {
                    src_factor: ::wgpu::BlendFactor::One,
                    dst_factor: ::wgpu::BlendFactor::One,
                    operation: ::wgpu::BlendOperation::Add,
                },
                alpha: ::wgpu::BlendComponent {
                    src_factor: ::wgpu::BlendFactor::Zero,
                    dst_factor: ::wgpu::BlendFactor::One,
                    operation: ::wgpu::BlendOperation::Add,
                },
            },
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod imp {
    use ::wgpu::util::DeviceExt;
    use std::borrow::Cow;
    use std::collections::HashMap;

    use foundation::math::Mat4;
    use scene::{NodeId, World};

    use super::{Globals, MeshVertex, PipelineKey, SphereInstance, StarInstance};
    use super::{sphere_mesh, star_instances};
    use crate::draw::{DrawList, SphereDraw};
    use crate::error::ViewerError;
    use crate::texture::DecodedTexture;

    const MESH_SHADER: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
    light_dir: vec4<f32>,
    light_color: vec4<f32>,
    ambient: vec4<f32>,
    viewport: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

@group(1) @binding(0)
var globe_tex: texture_2d<f32>;
@group(1) @binding(1)
var globe_sampler: sampler;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) color: vec4<f32>,
    @location(4) emissive: vec3<f32>,
    @location(5) params: vec4<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) m0: vec4<f32>,
    @location(4) m1: vec4<f32>,
    @location(5) m2: vec4<f32>,
    @location(6) m3: vec4<f32>,
    @location(7) color: vec4<f32>,
    @location(8) emissive: vec4<f32>,
    @location(9) params: vec4<f32>,
) -> VsOut {
    let model = mat4x4<f32>(m0, m1, m2, m3);
    let world = model * vec4<f32>(position, 1.0);
    var out: VsOut;
    out.pos = globals.view_proj * world;
    out.world_pos = world.xyz;
    // Uniform scale only, so the model matrix is fine for normals.
    out.normal = (model * vec4<f32>(normal, 0.0)).xyz;
    out.uv = uv;
    out.color = color;
    out.emissive = emissive.rgb;
    out.params = params;
    return out;
}

@fragment
fn fs_main(in: VsOut, @builtin(front_facing) front: bool) -> @location(0) vec4<f32> {
    let texel = textureSample(globe_tex, globe_sampler, in.uv);
    let textured = in.params.z;
    let base = in.color.rgb * mix(vec3<f32>(1.0), texel.rgb, textured);

    var n = normalize(in.normal);
    if (!front) {
        n = -n;
    }
    let l = normalize(globals.light_dir.xyz);
    let v = normalize(globals.eye.xyz - in.world_pos);
    let h = normalize(l + v);
    let ndotl = max(dot(n, l), 0.0);

    let roughness = clamp(in.params.x, 0.04, 1.0);
    let metalness = clamp(in.params.y, 0.0, 1.0);
    let diffuse = base * (1.0 - metalness);
    let f0 = mix(vec3<f32>(0.04), base, metalness);
    let shininess = mix(128.0, 2.0, roughness);
    let highlight = pow(max(dot(n, h), 0.0), shininess) * (1.0 - roughness) * ndotl;

    let lit = diffuse * (globals.ambient.rgb + globals.light_color.rgb * ndotl)
        + f0 * highlight * globals.light_color.rgb;
    let shaded = select(lit, base, in.params.w > 0.5) + in.emissive;
    let alpha = in.color.a * mix(1.0, texel.a, textured);
    return vec4<f32>(shaded * alpha, alpha);
}
"#;

    const STARS_SHADER: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
    light_dir: vec4<f32>,
    light_color: vec4<f32>,
    ambient: vec4<f32>,
    viewport: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) color: vec4<f32>,
};

// Screen-aligned square whose height is `size` world units at the point's
// depth (clip offset is depth independent before the divide).
@vertex
fn vs_main(
    @builtin(vertex_index) vid: u32,
    @location(0) center: vec3<f32>,
    @location(1) size: f32,
    @location(2) color: vec4<f32>,
) -> VsOut {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[vid];
    var clip = globals.view_proj * vec4<f32>(center, 1.0);
    let aspect = max(globals.viewport.z, 1e-6);
    clip.x = clip.x + corner.x * size * 0.5 / aspect;
    clip.y = clip.y + corner.y * size * 0.5;
    return VsOut(clip, color);
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return vec4<f32>(in.color.rgb * in.color.a, in.color.a);
}
"#;

    const DEPTH_FORMAT: ::wgpu::TextureFormat = ::wgpu::TextureFormat::Depth24Plus;

    const MESH_ATTRS: [::wgpu::VertexAttribute; 3] =
        ::wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
    const INSTANCE_ATTRS: [::wgpu::VertexAttribute; 7] = ::wgpu::vertex_attr_array![
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
        9 => Float32x4,
    ];
    const STAR_ATTRS: [::wgpu::VertexAttribute; 3] =
        ::wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32, 2 => Float32x4];

    #[derive(Debug)]
    struct SphereMesh {
        vertex_buffer: ::wgpu::Buffer,
        index_buffer: ::wgpu::Buffer,
        index_count: u32,
    }

    #[derive(Debug)]
    struct StarBuffer {
        buffer: ::wgpu::Buffer,
        count: u32,
        model: Mat4,
    }

    #[derive(Debug)]
    pub struct WgpuContext {
        pub _instance: &'static ::wgpu::Instance,
        pub surface: ::wgpu::Surface<'static>,
        pub device: ::wgpu::Device,
        pub queue: ::wgpu::Queue,
        pub config: ::wgpu::SurfaceConfiguration,
        pub _canvas: web_sys::HtmlCanvasElement,
        pub clear_color: ::wgpu::Color,
        globals_buffer: ::wgpu::Buffer,
        globals_bind_group: ::wgpu::BindGroup,
        texture_layout: ::wgpu::BindGroupLayout,
        sampler: ::wgpu::Sampler,
        texture_bind_group: ::wgpu::BindGroup,
        mesh_pipelines: Vec<::wgpu::RenderPipeline>,
        stars_pipeline: ::wgpu::RenderPipeline,
        depth_view: ::wgpu::TextureView,
        spheres: HashMap<u32, SphereMesh>,
        stars: HashMap<NodeId, StarBuffer>,
        instance_buffer: ::wgpu::Buffer,
        instance_capacity: u64,
    }

    fn gpu_err(what: &str, e: impl std::fmt::Display) -> ViewerError {
        ViewerError::Gpu(format!("{what}: {e}"))
    }

    fn create_depth_view(
        device: &::wgpu::Device,
        config: &::wgpu::SurfaceConfiguration,
    ) -> ::wgpu::TextureView {
        let tex = device.create_texture(&::wgpu::TextureDescriptor {
            label: Some("globe-depth"),
            size: ::wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: ::wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        tex.create_view(&::wgpu::TextureViewDescriptor::default())
    }

    fn create_instance_buffer(device: &::wgpu::Device, capacity: u64) -> ::wgpu::Buffer {
        device.create_buffer(&::wgpu::BufferDescriptor {
            label: Some("globe-sphere-instances"),
            size: capacity * std::mem::size_of::<SphereInstance>() as u64,
            usage: ::wgpu::BufferUsages::VERTEX | ::wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn upload_texture(
        device: &::wgpu::Device,
        queue: &::wgpu::Queue,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> ::wgpu::TextureView {
        let size = ::wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&::wgpu::TextureDescriptor {
            label: Some("globe-texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: ::wgpu::TextureDimension::D2,
            format: ::wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: ::wgpu::TextureUsages::TEXTURE_BINDING | ::wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            ::wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: ::wgpu::Origin3d::ZERO,
                aspect: ::wgpu::TextureAspect::All,
            },
            rgba,
            ::wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );
        texture.create_view(&::wgpu::TextureViewDescriptor::default())
    }

    fn texture_bind_group(
        device: &::wgpu::Device,
        layout: &::wgpu::BindGroupLayout,
        view: &::wgpu::TextureView,
        sampler: &::wgpu::Sampler,
    ) -> ::wgpu::BindGroup {
        device.create_bind_group(&::wgpu::BindGroupDescriptor {
            label: Some("globe-texture-bg"),
            layout,
            entries: &[
                ::wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ::wgpu::BindingResource::TextureView(view),
                },
                ::wgpu::BindGroupEntry {
                    binding: 1,
                    resource: ::wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn depth_state() -> Option<::wgpu::DepthStencilState> {
        Some(::wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: ::wgpu::CompareFunction::Less,
            stencil: ::wgpu::StencilState::default(),
            bias: ::wgpu::DepthBiasState::default(),
        })
    }

    fn mesh_pipeline(
        device: &::wgpu::Device,
        layout: &::wgpu::PipelineLayout,
        shader: &::wgpu::ShaderModule,
        format: ::wgpu::TextureFormat,
        key: PipelineKey,
    ) -> ::wgpu::RenderPipeline {
        device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
            label: Some("globe-mesh-pipeline"),
            layout: Some(layout),
            vertex: ::wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    ::wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<MeshVertex>() as ::wgpu::BufferAddress,
                        step_mode: ::wgpu::VertexStepMode::Vertex,
                        attributes: &MESH_ATTRS,
                    },
                    ::wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<SphereInstance>()
                            as ::wgpu::BufferAddress,
                        step_mode: ::wgpu::VertexStepMode::Instance,
                        attributes: &INSTANCE_ATTRS,
                    },
                ],
            },
            fragment: Some(::wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(::wgpu::ColorTargetState {
                    format,
                    blend: Some(key.blend_state()),
                    write_mask: ::wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: ::wgpu::PrimitiveState {
                topology: ::wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: ::wgpu::FrontFace::Ccw,
                cull_mode: key.cull_mode(),
                polygon_mode: ::wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: depth_state(),
            multisample: ::wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    pub async fn init_wgpu_from_canvas(
        canvas: web_sys::HtmlCanvasElement,
    ) -> Result<WgpuContext, ViewerError> {
        let width = canvas.width().max(1);
        let height = canvas.height().max(1);

        // The surface borrows the instance for 'static.
        let instance: &'static ::wgpu::Instance = Box::leak(Box::new(::wgpu::Instance::new(
            &::wgpu::InstanceDescriptor {
                backends: ::wgpu::Backends::BROWSER_WEBGPU | ::wgpu::Backends::GL,
                ..Default::default()
            },
        )));

        let surface = instance
            .create_surface(::wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| gpu_err("surface error", e))?;

        let adapter = instance
            .request_adapter(&::wgpu::RequestAdapterOptions {
                power_preference: ::wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| gpu_err("adapter error", e))?;

        let (device, queue) = adapter
            .request_device(&::wgpu::DeviceDescriptor {
                label: Some("globe-wgpu-device"),
                required_features: ::wgpu::Features::empty(),
                required_limits: ::wgpu::Limits::downlevel_webgl2_defaults(),
                ..Default::default()
            })
            .await
            .map_err(|e| gpu_err("device error", e))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| ViewerError::Gpu("surface reports no formats".to_string()))?;
        let alpha_mode = caps
            .alpha_modes
            .iter()
            .copied()
            .find(|m| *m == ::wgpu::CompositeAlphaMode::PreMultiplied)
            .or_else(|| caps.alpha_modes.first().copied())
            .unwrap_or(::wgpu::CompositeAlphaMode::Auto);

        let config = ::wgpu::SurfaceConfiguration {
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            desired_maximum_frame_latency: 2,
            present_mode: ::wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        tracing::info!(?format, ?alpha_mode, width, height, "surface configured");

        let depth_view = create_depth_view(&device, &config);

        let mesh_shader = device.create_shader_module(::wgpu::ShaderModuleDescriptor {
            label: Some("globe-mesh-shader"),
            source: ::wgpu::ShaderSource::Wgsl(Cow::Borrowed(MESH_SHADER)),
        });
        let stars_shader = device.create_shader_module(::wgpu::ShaderModuleDescriptor {
            label: Some("globe-stars-shader"),
            source: ::wgpu::ShaderSource::Wgsl(Cow::Borrowed(STARS_SHADER)),
        });

        let globals_buffer = device.create_buffer(&::wgpu::BufferDescriptor {
            label: Some("globe-globals"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let globals_layout = device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
            label: Some("globe-globals-bgl"),
            entries: &[::wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: ::wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: ::wgpu::BindingType::Buffer {
                    ty: ::wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let globals_bind_group = device.create_bind_group(&::wgpu::BindGroupDescriptor {
            label: Some("globe-globals-bg"),
            layout: &globals_layout,
            entries: &[::wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
            label: Some("globe-texture-bgl"),
            entries: &[
                ::wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ::wgpu::ShaderStages::FRAGMENT,
                    ty: ::wgpu::BindingType::Texture {
                        sample_type: ::wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: ::wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                ::wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ::wgpu::ShaderStages::FRAGMENT,
                    ty: ::wgpu::BindingType::Sampler(::wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&::wgpu::SamplerDescriptor {
            label: Some("globe-sampler"),
            address_mode_u: ::wgpu::AddressMode::Repeat,
            address_mode_v: ::wgpu::AddressMode::ClampToEdge,
            mag_filter: ::wgpu::FilterMode::Linear,
            min_filter: ::wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Untextured draws still bind something; a white texel is neutral.
        let white = upload_texture(&device, &queue, 1, 1, &[255, 255, 255, 255]);
        let texture_bind_group = texture_bind_group(&device, &texture_layout, &white, &sampler);

        let mesh_layout = device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
            label: Some("globe-mesh-pipeline-layout"),
            bind_group_layouts: &[&globals_layout, &texture_layout],
            immediate_size: 0,
        });
        let mesh_pipelines = PipelineKey::ALL
            .iter()
            .map(|key| mesh_pipeline(&device, &mesh_layout, &mesh_shader, format, *key))
            .collect();

        let stars_layout = device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
            label: Some("globe-stars-pipeline-layout"),
            bind_group_layouts: &[&globals_layout],
            immediate_size: 0,
        });
        let stars_pipeline = device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
            label: Some("globe-stars-pipeline"),
            layout: Some(&stars_layout),
            vertex: ::wgpu::VertexState {
                module: &stars_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[::wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<StarInstance>() as ::wgpu::BufferAddress,
                    step_mode: ::wgpu::VertexStepMode::Instance,
                    attributes: &STAR_ATTRS,
                }],
            },
            fragment: Some(::wgpu::FragmentState {
                module: &stars_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(::wgpu::ColorTargetState {
                    format,
                    blend: Some(::wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: ::wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: ::wgpu::PrimitiveState {
                topology: ::wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: ::wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: ::wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: depth_state(),
            multisample: ::wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let instance_capacity = 64;
        let instance_buffer = create_instance_buffer(&device, instance_capacity);

        Ok(WgpuContext {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            _canvas: canvas,
            clear_color: ::wgpu::Color::TRANSPARENT,
            globals_buffer,
            globals_bind_group,
            texture_layout,
            sampler,
            texture_bind_group,
            mesh_pipelines,
            stars_pipeline,
            depth_view,
            spheres: HashMap::new(),
            stars: HashMap::new(),
            instance_buffer,
            instance_capacity,
        })
    }

    pub fn resize_wgpu(ctx: &mut WgpuContext, width: u32, height: u32) {
        ctx.config.width = width.max(1);
        ctx.config.height = height.max(1);
        ctx.surface.configure(&ctx.device, &ctx.config);
        ctx.depth_view = create_depth_view(&ctx.device, &ctx.config);
    }

    /// Replaces the texture sampled by `textured` materials.
    pub fn set_globe_texture(ctx: &mut WgpuContext, tex: &DecodedTexture) {
        let view = upload_texture(&ctx.device, &ctx.queue, tex.width, tex.height, &tex.rgba);
        ctx.texture_bind_group =
            texture_bind_group(&ctx.device, &ctx.texture_layout, &view, &ctx.sampler);
        tracing::debug!(width = tex.width, height = tex.height, "globe texture uploaded");
    }

    fn ensure_sphere(ctx: &mut WgpuContext, segments: u32) {
        if ctx.spheres.contains_key(&segments) {
            return;
        }
        let (vertices, indices) = sphere_mesh(segments);
        let vertex_buffer = ctx
            .device
            .create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                label: Some("globe-sphere-vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: ::wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = ctx
            .device
            .create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                label: Some("globe-sphere-indices"),
                contents: bytemuck::cast_slice(&indices),
                usage: ::wgpu::BufferUsages::INDEX,
            });
        ctx.spheres.insert(
            segments,
            SphereMesh {
                vertex_buffer,
                index_buffer,
                index_count: indices.len() as u32,
            },
        );
    }

    fn sync_stars<P>(ctx: &mut WgpuContext, list: &DrawList, world: &World<P>) {
        for draw in &list.points {
            let fresh = ctx
                .stars
                .get(&draw.node)
                .is_some_and(|cached| cached.model == draw.model);
            if fresh {
                continue;
            }
            let Some(points) = world.point_cloud(draw.cloud) else {
                continue;
            };
            let instances = star_instances(points, draw);
            if instances.is_empty() {
                continue;
            }
            let buffer = ctx
                .device
                .create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                    label: Some("globe-star-instances"),
                    contents: bytemuck::cast_slice(&instances),
                    usage: ::wgpu::BufferUsages::VERTEX,
                });
            ctx.stars.insert(
                draw.node,
                StarBuffer {
                    buffer,
                    count: instances.len() as u32,
                    model: draw.model,
                },
            );
        }
    }

    fn draw_sphere(
        rpass: &mut ::wgpu::RenderPass<'_>,
        ctx: &WgpuContext,
        slot: u64,
        draw: &SphereDraw,
    ) {
        let Some(mesh) = ctx.spheres.get(&draw.segments) else {
            return;
        };
        let stride = std::mem::size_of::<SphereInstance>() as u64;
        let key = PipelineKey::for_material(&draw.material);
        rpass.set_pipeline(&ctx.mesh_pipelines[key.index()]);
        rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        rpass.set_vertex_buffer(1, ctx.instance_buffer.slice(slot * stride..(slot + 1) * stride));
        rpass.set_index_buffer(mesh.index_buffer.slice(..), ::wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
    }

    /// Draws opaque spheres, then point clouds, then transparent spheres in
    /// the order `list` gives them.
    pub fn render_frame<P>(
        ctx: &mut WgpuContext,
        list: &DrawList,
        world: &World<P>,
    ) -> Result<(), ViewerError> {
        let instances: Vec<SphereInstance> = list
            .opaque
            .iter()
            .chain(list.transparent.iter())
            .map(SphereInstance::from_draw)
            .collect();
        let needed = instances.len() as u64;
        if needed > ctx.instance_capacity {
            ctx.instance_capacity = needed.next_power_of_two();
            ctx.instance_buffer = create_instance_buffer(&ctx.device, ctx.instance_capacity);
        }
        for draw in list.opaque.iter().chain(list.transparent.iter()) {
            ensure_sphere(ctx, draw.segments);
        }
        sync_stars(ctx, list, world);

        let ctx = &*ctx;
        let frame = match ctx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(e) => {
                // Typically a lost or outdated surface; reconfigure and skip.
                ctx.surface.configure(&ctx.device, &ctx.config);
                return Err(gpu_err("surface acquire failed", e));
            }
        };
        let view = frame
            .texture
            .create_view(&::wgpu::TextureViewDescriptor::default());

        let globals = Globals::from_draw_list(list, ctx.config.width, ctx.config.height);
        ctx.queue
            .write_buffer(&ctx.globals_buffer, 0, bytemuck::bytes_of(&globals));
        if !instances.is_empty() {
            ctx.queue
                .write_buffer(&ctx.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        let mut encoder = ctx
            .device
            .create_command_encoder(&::wgpu::CommandEncoderDescriptor {
                label: Some("globe-frame-encoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&::wgpu::RenderPassDescriptor {
                label: Some("globe-scene-pass"),
                color_attachments: &[Some(::wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: ::wgpu::Operations {
                        load: ::wgpu::LoadOp::Clear(ctx.clear_color),
                        store: ::wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(::wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_view,
                    depth_ops: Some(::wgpu::Operations {
                        load: ::wgpu::LoadOp::Clear(1.0),
                        store: ::wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            rpass.set_bind_group(0, &ctx.globals_bind_group, &[]);
            rpass.set_bind_group(1, &ctx.texture_bind_group, &[]);

            let mut slot = 0u64;
            for draw in &list.opaque {
                draw_sphere(&mut rpass, ctx, slot, draw);
                slot += 1;
            }

            rpass.set_pipeline(&ctx.stars_pipeline);
            for draw in &list.points {
                if let Some(stars) = ctx.stars.get(&draw.node) {
                    rpass.set_vertex_buffer(0, stars.buffer.slice(..));
                    rpass.draw(0..6, 0..stars.count);
                }
            }

            for draw in &list.transparent {
                draw_sphere(&mut rpass, ctx, slot, draw);
                slot += 1;
            }
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use scene::World;

    use crate::draw::DrawList;
    use crate::error::ViewerError;
    use crate::texture::DecodedTexture;

    #[derive(Debug, Default)]
    pub struct WgpuContext;

    pub async fn init_wgpu_from_canvas(
        _canvas: web_sys::HtmlCanvasElement,
    ) -> Result<WgpuContext, ViewerError> {
        Err(ViewerError::Gpu(
            "wgpu initialization is only available on wasm32 targets".to_string(),
        ))
    }

    pub fn resize_wgpu(_ctx: &mut WgpuContext, _width: u32, _height: u32) {}

    pub fn set_globe_texture(_ctx: &mut WgpuContext, _tex: &DecodedTexture) {}

    pub fn render_frame<P>(
        _ctx: &mut WgpuContext,
        _list: &DrawList,
        _world: &World<P>,
    ) -> Result<(), ViewerError> {
        Err(ViewerError::Gpu(
            "wgpu rendering is only available on wasm32 targets".to_string(),
        ))
    }
}

pub use imp::{WgpuContext, init_wgpu_from_canvas, render_frame, resize_wgpu, set_globe_texture};
