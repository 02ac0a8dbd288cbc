use half::f16;
use wgpu::{Device, Texture, TextureView, TextureViewDescriptor};

use super::device::GpuDevice;
use super::layouts::OUTPUT_FORMAT;
use crate::error::EvalError;

const BYTES_PER_PIXEL: u32 = 8; // 4 channels x 2 bytes (f16)

/// Double-buffered output image: kernels write `back`, the display reads `front`
pub struct OutputTextures {
    pub back: Texture,
    pub front: Texture,
    pub back_store: TextureView,
    pub front_sample: TextureView,
    pub size: [u32; 2],
}

impl OutputTextures {
    pub fn new(device: &Device, size: [u32; 2]) -> Self {
        let back = Self::create_texture(device, "output_back", size);
        let front = Self::create_texture(device, "output_front", size);

        let back_store = back.create_view(&TextureViewDescriptor {
            label: Some("output_back_store"),
            format: Some(OUTPUT_FORMAT),
            dimension: Some(wgpu::TextureViewDimension::D2),
            aspect: wgpu::TextureAspect::All,
            base_mip_level: 0,
            mip_level_count: Some(1),
            base_array_layer: 0,
            array_layer_count: Some(1),
        });
        let front_sample = front.create_view(&TextureViewDescriptor::default());

        Self {
            back,
            front,
            back_store,
            front_sample,
            size,
        }
    }

    fn create_texture(device: &Device, label: &str, size: [u32; 2]) -> Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: Self::extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OUTPUT_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    fn extent(size: [u32; 2]) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: size[0],
            height: size[1],
            depth_or_array_layers: 1,
        }
    }

    /// Row pitch of a texture copy, rounded up to the 256-byte copy alignment
    pub fn padded_bytes_per_row(width: u32) -> u32 {
        let unpadded = width * BYTES_PER_PIXEL;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        unpadded.div_ceil(align) * align
    }

    /// Record a copy of the back image over the front image
    pub fn present(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_texture_to_texture(
            wgpu::ImageCopyTexture {
                texture: &self.back,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyTexture {
                texture: &self.front,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            Self::extent(self.size),
        );
    }

    /// Download the front image as f32 RGBA, row-major
    pub fn download_front(&self, gpu: &GpuDevice) -> Result<Vec<[f32; 4]>, EvalError> {
        let [width, height] = self.size;
        let padded_bpr = Self::padded_bytes_per_row(width);
        let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("output_download_staging"),
            size: padded_bpr as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        gpu.scoped_submit("output_download_encoder", |encoder| {
            encoder.copy_texture_to_buffer(
                wgpu::ImageCopyTexture {
                    texture: &self.front,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::ImageCopyBuffer {
                    buffer: &staging,
                    layout: wgpu::ImageDataLayout {
                        offset: 0,
                        bytes_per_row: Some(padded_bpr),
                        rows_per_image: Some(height),
                    },
                },
                Self::extent(self.size),
            );
        })
        .map_err(|e| EvalError::Readback(e.to_string()))?;

        let bytes = gpu.map_staging(&staging)?;
        Ok(decode_rows(&bytes, width, height, padded_bpr))
    }
}

/// Strip row padding and widen f16 texels to f32
fn decode_rows(bytes: &[u8], width: u32, height: u32, padded_bpr: u32) -> Vec<[f32; 4]> {
    let row_bytes = (width * BYTES_PER_PIXEL) as usize;
    let mut pixels = Vec::with_capacity((width * height) as usize);
    for row in bytes.chunks(padded_bpr as usize).take(height as usize) {
        for texel in row[..row_bytes].chunks_exact(BYTES_PER_PIXEL as usize) {
            let mut rgba = [0.0f32; 4];
            for (channel, pair) in rgba.iter_mut().zip(texel.chunks_exact(2)) {
                *channel = f16::from_le_bytes([pair[0], pair[1]]).to_f32();
            }
            pixels.push(rgba);
        }
    }
    pixels
}
