//! Camera-A client (C3): buffered object detection with FIFO ingestion,
//! automatic refill, and protection-polygon filtering.

use crate::error::DeviceError;
use crate::handshake::{self, HandshakeDescriptor, HandshakeTiming};
use cell_protocol::{decode_i32_be, registers::camera_a, DetectionRecord, ProtectionPolygon, StatusWord, VisionCommand};
use cell_transport::ModbusTransport;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Bound on how long a late `get_next_object` caller waits behind an
/// in-flight capture before retrying on its own.
const CAPTURE_WAIT_TIMEOUT: Duration = Duration::from_secs(20);

struct Inner {
    fifo: Mutex<VecDeque<DetectionRecord>>,
    capture_in_progress: AtomicBool,
    /// Total objects the peer reported on the most recent capture+detect,
    /// before the protection-polygon filter drops any of them. Read by
    /// callers that need the raw crowding figure rather than the post-
    /// filter FIFO contents.
    last_reported_count: AtomicU16,
}

/// A handle to camera-A's register block. Cheap to clone; all instances
/// share the same FIFO and in-flight-capture flag.
#[derive(Clone)]
pub struct CameraClient {
    transport: ModbusTransport,
    base: u16,
    polygon: ProtectionPolygon,
    handshake_timing: HandshakeTiming,
    inner: Arc<Inner>,
}

impl CameraClient {
    pub fn new(transport: ModbusTransport, base: u16, polygon: ProtectionPolygon) -> Self {
        Self::with_handshake_timing(transport, base, polygon, HandshakeTiming::default())
    }

    pub fn with_handshake_timing(
        transport: ModbusTransport,
        base: u16,
        polygon: ProtectionPolygon,
        handshake_timing: HandshakeTiming,
    ) -> Self {
        Self {
            transport,
            base,
            polygon,
            handshake_timing,
            inner: Arc::new(Inner {
                fifo: Mutex::new(VecDeque::new()),
                capture_in_progress: AtomicBool::new(false),
                last_reported_count: AtomicU16::new(0),
            }),
        }
    }

    fn reg(&self, offset: u16) -> u16 {
        self.base + offset
    }

    /// Total objects the peer reported on the most recent capture+detect,
    /// independent of how many survived the protection-polygon filter.
    pub fn last_reported_count(&self) -> u16 {
        self.inner.last_reported_count.load(Ordering::Acquire)
    }

    pub fn is_ready(&self) -> Result<bool, DeviceError> {
        Ok(self.system_status()?.accepts_command())
    }

    pub fn system_status(&self) -> Result<StatusWord, DeviceError> {
        let raw = self.transport.read_u16(self.reg(camera_a::STATUS_WORD))?;
        Ok(StatusWord::from_raw(raw))
    }

    pub fn queue_status(&self) -> Result<u16, DeviceError> {
        Ok(self.transport.read_u16(self.reg(camera_a::COUNT))?)
    }

    pub fn clear_queue(&self) {
        self.inner.fifo.lock().clear();
    }

    /// Returns the next buffered detection, refilling from the peer as
    /// needed. `None` means "no objects available, caller should trigger a
    /// refill action" only after every refill avenue has been exhausted.
    pub fn get_next_object(&self) -> Result<Option<DetectionRecord>, DeviceError> {
        if let Some(record) = self.inner.fifo.lock().pop_front() {
            return Ok(Some(record));
        }

        let peer_count = self.queue_status()?;
        if peer_count > 0 {
            self.ingest(peer_count)?;
            return Ok(self.inner.fifo.lock().pop_front());
        }

        match self.capture_and_ingest() {
            Ok(()) => Ok(self.inner.fifo.lock().pop_front()),
            Err(DeviceError::NoObjects) | Err(DeviceError::DetectionFailed) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// Forces a capture+detect cycle regardless of current FIFO state.
    pub fn manual_capture(&self) -> Result<(), DeviceError> {
        self.capture_and_ingest()
    }

    fn capture_and_ingest(&self) -> Result<(), DeviceError> {
        if self
            .inner
            .capture_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let result = self.run_capture_detect();
            self.inner.capture_in_progress.store(false, Ordering::SeqCst);
            return result;
        }

        // Another caller is already capturing; wait for it to finish, then
        // just report whatever landed in the FIFO rather than racing a
        // second capture in.
        let deadline = Instant::now() + CAPTURE_WAIT_TIMEOUT;
        while self.inner.capture_in_progress.load(Ordering::SeqCst) {
            if Instant::now() >= deadline {
                warn!("camera-a: timed out waiting for an in-flight capture");
                return Err(DeviceError::Timeout);
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        Ok(())
    }

    fn run_capture_detect(&self) -> Result<(), DeviceError> {
        let mut descriptor = HandshakeDescriptor {
            command_reg: self.reg(camera_a::COMMAND),
            status_reg: self.reg(camera_a::STATUS_WORD),
            command_code: VisionCommand::CaptureDetect.into(),
            clear_before_issue: vec![self.reg(camera_a::CAPTURE_DONE), self.reg(camera_a::DETECT_DONE)],
            ..HandshakeDescriptor::default()
        };
        self.handshake_timing.apply(&mut descriptor);

        let transport = self.transport.clone();
        let outcome = handshake::run(&transport, &descriptor, |t| {
            let op_success = t.read_u16(self.reg(camera_a::OP_SUCCESS))?;
            let count = t.read_u16(self.reg(camera_a::COUNT))?;
            Ok((op_success, count))
        })?;

        let (op_success, count) = outcome;
        self.inner.last_reported_count.store(count, Ordering::Release);
        if op_success == 0 {
            return Err(DeviceError::DetectionFailed);
        }
        if count == 0 {
            return Err(DeviceError::NoObjects);
        }
        self.ingest(count)
    }

    /// Reads `count` pixel/world records out of the peer's fixed slots,
    /// filters by the protection polygon, and zeroes the slots so the same
    /// results aren't re-ingested on a later poll.
    fn ingest(&self, count: u16) -> Result<(), DeviceError> {
        let count = count.min(camera_a::MAX_OBJECTS);
        let mut accepted = Vec::new();

        for i in 0..count {
            let pixel_addr = self.reg(camera_a::PIXEL_START + i * camera_a::PIXEL_STRIDE);
            let pixel = self.transport.read_block(pixel_addr, 3)?;
            let (px, py, radius) = (pixel[0] as i32, pixel[1] as i32, pixel[2] as i32);

            let world_addr = self.reg(camera_a::WORLD_START + i * camera_a::WORLD_STRIDE);
            let world = self.transport.read_block(world_addr, 4)?;
            let wx = decode_i32_be(world[0], world[1]) as f64 / 100.0;
            let wy = decode_i32_be(world[2], world[3]) as f64 / 100.0;

            if !self.polygon.contains(wx, wy) {
                debug!(wx, wy, "camera-a: dropping detection outside protection polygon");
                self.zero_slot(i)?;
                continue;
            }

            accepted.push(DetectionRecord {
                id: i as u32,
                pixel_xy: (px, py),
                radius,
                world_xy: (wx, wy),
                timestamp_ms: 0,
                r: None,
            });
            self.zero_slot(i)?;
        }

        info!(ingested = accepted.len(), reported = count, "camera-a: ingested detections");
        self.transport.write_u16(self.reg(camera_a::COUNT), 0)?;
        let mut fifo = self.inner.fifo.lock();
        fifo.extend(accepted);
        Ok(())
    }

    fn zero_slot(&self, index: u16) -> Result<(), DeviceError> {
        let pixel_addr = self.reg(camera_a::PIXEL_START + index * camera_a::PIXEL_STRIDE);
        self.transport.write_block(pixel_addr, vec![0; 3])?;
        let world_addr = self.reg(camera_a::WORLD_START + index * camera_a::WORLD_STRIDE);
        self.transport.write_block(world_addr, vec![0; 4])?;
        Ok(())
    }
}

impl crate::peripheral::Sealed for CameraClient {}
impl crate::peripheral::Peripheral for CameraClient {
    fn transport(&self) -> &ModbusTransport {
        &self.transport
    }

    fn status_reg(&self) -> u16 {
        self.reg(camera_a::STATUS_WORD)
    }

    fn command_reg(&self) -> u16 {
        self.reg(camera_a::COMMAND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cell_protocol::ProtectionPolygon;

    fn unbounded_polygon() -> ProtectionPolygon {
        ProtectionPolygon::new([(-1e9, -1e9), (1e9, -1e9), (1e9, 1e9), (-1e9, 1e9)])
    }

    #[test]
    fn fifo_starts_empty() {
        let transport = ModbusTransport::connect("127.0.0.1:1".parse().unwrap());
        let client = CameraClient::new(transport, 200, unbounded_polygon());
        assert!(client.inner.fifo.lock().is_empty());
    }
}
