use wgpu::util::DeviceExt;
use wgpu::{Adapter, Device, Instance, Queue, RequestAdapterOptions, Surface};

use crate::error::EvalError;

/// GPU device manager, headless or tied to a presentation surface
pub struct GpuDevice {
    pub instance: Instance,
    pub adapter: Adapter,
    pub device: Device,
    pub queue: Queue,
}

impl GpuDevice {
    /// Create a new GPU device for headless compute
    pub async fn new() -> Result<Self, EvalError> {
        Self::with_instance(Instance::default(), None).await
    }

    /// Create a device on `instance` that can present to `surface`
    pub async fn with_instance(instance: Instance, surface: Option<&Surface<'_>>) -> Result<Self, EvalError> {
        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(EvalError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    label: Some("umbra_device"),
                },
                None,
            )
            .await
            .map_err(|e| EvalError::Device(e.to_string()))?;

        let gpu = Self {
            instance,
            adapter,
            device,
            queue,
        };
        log::info!("{}", gpu.info());
        Ok(gpu)
    }

    /// Get device info for logging
    pub fn info(&self) -> String {
        let info = self.adapter.get_info();
        format!("GPU: {} ({:?}), Features: {:?}", info.name, info.backend, self.device.features())
    }

    /// Create a buffer with initial data
    pub fn create_buffer_with_data<T: bytemuck::Pod>(
        &self,
        label: &str,
        usage: wgpu::BufferUsages,
        data: &[T],
    ) -> wgpu::Buffer {
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(data),
            usage,
        })
    }

    /// Create a uniform buffer from raw block bytes
    pub fn create_uniform_buffer(&self, label: &str, bytes: &[u8]) -> wgpu::Buffer {
        self.create_buffer_with_data(label, wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST, bytes)
    }

    /// Create a structured buffer the kernels can read and write and the host can copy
    pub fn create_storage_buffer(&self, label: &str, bytes: &[u8]) -> wgpu::Buffer {
        self.create_buffer_with_data(
            label,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
            bytes,
        )
    }

    /// Submit commands to the GPU
    pub fn submit(&self, commands: wgpu::CommandBuffer) {
        self.queue.submit(Some(commands));
    }

    /// Wait for GPU operations to complete
    pub fn wait(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }

    /// Run `record` inside a validation error scope and submit what it recorded
    ///
    /// Validation failures come back as [`EvalError::Dispatch`] instead of reaching the
    /// device's uncaptured error handler.
    pub fn scoped_submit<F>(&self, label: &str, record: F) -> Result<(), EvalError>
    where
        F: FnOnce(&mut wgpu::CommandEncoder),
    {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        record(&mut encoder);
        self.submit(encoder.finish());

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(EvalError::Dispatch(format!("{}: {}", label, err))),
            None => Ok(()),
        }
    }

    /// Copy `source` into a mappable staging buffer and read it back, blocking
    pub fn read_back(&self, source: &wgpu::Buffer, size: u64) -> Result<Vec<u8>, EvalError> {
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_staging"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        self.scoped_submit("readback_encoder", |encoder| {
            encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
        })
        .map_err(|e| EvalError::Readback(e.to_string()))?;

        self.map_staging(&staging)
    }

    /// Map a staging buffer that already holds the data and copy it out
    pub fn map_staging(&self, staging: &wgpu::Buffer) -> Result<Vec<u8>, EvalError> {
        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.wait();

        match receiver.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(EvalError::Readback(err.to_string())),
            Err(_) => return Err(EvalError::Readback("map callback never ran".to_string())),
        }

        let bytes = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(bytes)
    }
}
